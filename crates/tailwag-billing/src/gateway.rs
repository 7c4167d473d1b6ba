//! # Payment Gateway Adapter
//!
//! The seam between billing and the card-vault payment provider. Charges
//! reference vault profile identifiers - raw card data never crosses this
//! boundary.
//!
//! ## Seam Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BillingRun / Checkout                                                  │
//! │       │                                                                 │
//! │       │  gateway.charge(&ChargeRequest { profile ids, amount, ... })    │
//! │       ▼                                                                 │
//! │  dyn PaymentGateway  ──► production: card-vault HTTP client             │
//! │                      ──► tests: MockGateway (scripted outcomes)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use thiserror::Error;

use tailwag_core::Money;

/// A request to vault a card. `payment_nonce` is the provider's one-time
/// opaque token from the storefront's hosted card form; no PAN or CVV ever
/// reaches this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProfileRequest {
    pub customer_id: String,
    pub email: String,
    pub payment_nonce: String,
}

/// A vaulted card, as the provider reports it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultProfile {
    pub customer_profile_id: String,
    pub payment_profile_id: String,
    /// Card brand detected by the provider, if reported.
    pub card_brand: Option<String>,
    pub last_four: Option<String>,
}

/// A charge against a vaulted payment profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    /// Vault customer profile identifier.
    pub customer_profile_id: String,
    /// Vault payment profile identifier.
    pub payment_profile_id: String,
    pub amount: Money,
    /// Invoice or order reference, shown on the customer's statement.
    pub reference: String,
    pub description: String,
}

/// A successful charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeOutcome {
    /// Gateway transaction identifier.
    pub transaction_id: String,
}

/// A refund of a settled transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    /// The original charge's transaction identifier.
    pub transaction_id: String,
    pub amount: Money,
    pub reference: String,
}

/// Gateway failures.
///
/// `Declined` is the normal dunning case; `Transport` covers the provider
/// being unreachable. The billing run treats both as a failed attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The provider processed the request and said no.
    #[error("Card declined: {reason}")]
    Declined { reason: String },

    /// The vault rejected the profile reference (stale or deleted).
    #[error("Invalid payment profile: {0}")]
    InvalidProfile(String),

    /// Could not reach the provider.
    #[error("Gateway unreachable: {0}")]
    Transport(String),
}

/// The payment provider seam.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Vaults a card from a one-time nonce.
    async fn create_profile(
        &self,
        request: &CreateProfileRequest,
    ) -> Result<VaultProfile, GatewayError>;

    /// Charges the given profile. Must not retry internally - retry policy
    /// belongs to the billing run.
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, GatewayError>;

    /// Refunds a settled transaction, fully or partially.
    async fn refund(&self, request: &RefundRequest) -> Result<ChargeOutcome, GatewayError>;

    /// Deletes a vaulted payment profile.
    async fn delete_profile(
        &self,
        customer_profile_id: &str,
        payment_profile_id: &str,
    ) -> Result<(), GatewayError>;
}

// =============================================================================
// Mock Gateway
// =============================================================================

/// Scriptable in-memory gateway for tests and local development.
///
/// Records every charge request and pops outcomes from a script; an empty
/// script approves everything.
#[derive(Debug, Default)]
pub struct MockGateway {
    requests: std::sync::Mutex<Vec<ChargeRequest>>,
    refunds: std::sync::Mutex<Vec<RefundRequest>>,
    deleted_profiles: std::sync::Mutex<Vec<String>>,
    script: std::sync::Mutex<Vec<Result<(), GatewayError>>>,
    counter: std::sync::atomic::AtomicU64,
}

impl MockGateway {
    /// A gateway that approves every charge.
    pub fn approving() -> Self {
        MockGateway::default()
    }

    /// A gateway that answers charges in order from `outcomes`, then
    /// approves. `Ok(())` approves, `Err(e)` fails with that error.
    pub fn scripted(outcomes: Vec<Result<(), GatewayError>>) -> Self {
        MockGateway {
            script: std::sync::Mutex::new(outcomes),
            ..MockGateway::default()
        }
    }

    /// A gateway that declines every charge.
    pub fn declining(reason: &str) -> Self {
        // A long enough script to outlast any retry ladder
        let script = (0..16)
            .map(|_| {
                Err(GatewayError::Declined {
                    reason: reason.to_string(),
                })
            })
            .collect();
        MockGateway {
            script: std::sync::Mutex::new(script),
            ..MockGateway::default()
        }
    }

    /// The charge requests seen so far.
    pub fn requests(&self) -> Vec<ChargeRequest> {
        self.requests.lock().expect("mock lock").clone()
    }

    /// Number of charges attempted.
    pub fn charge_count(&self) -> usize {
        self.requests.lock().expect("mock lock").len()
    }

    /// The refund requests seen so far.
    pub fn refunds(&self) -> Vec<RefundRequest> {
        self.refunds.lock().expect("mock lock").clone()
    }

    /// Payment profile ids deleted so far.
    pub fn deleted_profiles(&self) -> Vec<String> {
        self.deleted_profiles.lock().expect("mock lock").clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        format!("{}-{}", prefix, n + 1)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_profile(
        &self,
        _request: &CreateProfileRequest,
    ) -> Result<VaultProfile, GatewayError> {
        Ok(VaultProfile {
            customer_profile_id: self.next_id("mock-cust"),
            payment_profile_id: self.next_id("mock-card"),
            card_brand: Some("Visa".to_string()),
            last_four: Some("4242".to_string()),
        })
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, GatewayError> {
        self.requests.lock().expect("mock lock").push(request.clone());

        let next = {
            let mut script = self.script.lock().expect("mock lock");
            if script.is_empty() {
                Ok(())
            } else {
                script.remove(0)
            }
        };
        next?;

        Ok(ChargeOutcome {
            transaction_id: self.next_id("mock-txn"),
        })
    }

    async fn refund(&self, request: &RefundRequest) -> Result<ChargeOutcome, GatewayError> {
        self.refunds.lock().expect("mock lock").push(request.clone());
        Ok(ChargeOutcome {
            transaction_id: self.next_id("mock-ref"),
        })
    }

    async fn delete_profile(
        &self,
        _customer_profile_id: &str,
        payment_profile_id: &str,
    ) -> Result<(), GatewayError> {
        self.deleted_profiles
            .lock()
            .expect("mock lock")
            .push(payment_profile_id.to_string());
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
