//! # Payment Profile Management
//!
//! Vaults and removes cards through the gateway, mirroring the resulting
//! profile identifiers into the local `payment_methods` table. The local
//! row holds only profile ids plus masked display metadata; the vault is
//! the sole holder of real card data.

use std::sync::Arc;
use tracing::info;

use tailwag_core::types::CardBrand;
use tailwag_core::PaymentMethod;
use tailwag_db::repository::payment_method::NewPaymentMethod;
use tailwag_db::Database;

use crate::error::BillingResult;
use crate::gateway::{CreateProfileRequest, PaymentGateway};

/// Card vaulting and removal.
pub struct PaymentProfileService {
    db: Database,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentProfileService {
    pub fn new(db: Database, gateway: Arc<dyn PaymentGateway>) -> Self {
        PaymentProfileService { db, gateway }
    }

    /// Vaults a card from a one-time nonce and records the resulting
    /// profile locally.
    pub async fn vault_card(
        &self,
        request: &CreateProfileRequest,
        make_default: bool,
    ) -> BillingResult<PaymentMethod> {
        let profile = self.gateway.create_profile(request).await?;

        let method = self
            .db
            .payment_methods()
            .create(NewPaymentMethod {
                customer_id: request.customer_id.clone(),
                customer_profile_id: profile.customer_profile_id,
                payment_profile_id: profile.payment_profile_id,
                card_brand: profile
                    .card_brand
                    .as_deref()
                    .and_then(CardBrand::from_provider),
                last_four: profile.last_four,
                expiration_month: None,
                expiration_year: None,
                make_default,
            })
            .await?;

        info!(
            customer_id = %request.customer_id,
            payment_method_id = %method.id,
            "Card vaulted"
        );
        Ok(method)
    }

    /// Deletes the vault profile, then soft-deactivates the local row so
    /// historical invoices keep a valid reference.
    pub async fn remove_card(&self, payment_method_id: &str) -> BillingResult<()> {
        let method = self.db.payment_methods().get_by_id(payment_method_id).await?;

        self.gateway
            .delete_profile(&method.customer_profile_id, &method.payment_profile_id)
            .await?;
        self.db.payment_methods().deactivate(payment_method_id).await?;

        info!(payment_method_id = %payment_method_id, "Card removed");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use tailwag_db::DbConfig;

    #[tokio::test]
    async fn test_vault_then_remove_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let gateway = Arc::new(MockGateway::approving());
        let service = PaymentProfileService::new(db.clone(), gateway.clone());

        let method = service
            .vault_card(
                &CreateProfileRequest {
                    customer_id: "cust-1".into(),
                    email: "pup@example.com".into(),
                    payment_nonce: "opaque-nonce".into(),
                },
                true,
            )
            .await
            .unwrap();
        assert!(method.is_default);
        assert_eq!(method.card_brand, Some(CardBrand::Visa));
        assert_eq!(method.last_four.as_deref(), Some("4242"));

        service.remove_card(&method.id).await.unwrap();

        let removed = db.payment_methods().get_by_id(&method.id).await.unwrap();
        assert!(!removed.is_active);
        assert_eq!(
            gateway.deleted_profiles(),
            vec![removed.payment_profile_id.clone()]
        );
    }
}
