use crate::{
    db::Connection,
    error::{Entity, Error, Result},
    schema::{Customer, CustomerInput, CustomerPatch, User},
};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct CustomerService {
    conn: Connection,
}

impl CustomerService {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub async fn get_customer(&self, customer_id: Uuid) -> Result<Customer> {
        let customer = self.conn.get::<Customer>(&customer_id).await.map_err(|err| {
            tracing::warn!(%customer_id, "customer does not exist");
            err
        })?;
        tracing::info!(?customer, "got customer");
        Ok(customer)
    }

    /// Create the customer profile of `user`.
    ///
    /// A user has at most one customer profile. If `user` already has one, it is returned as is
    /// and `input` is ignored, though it must still be valid.
    pub async fn create_customer(&self, input: CustomerInput, user: &User) -> Result<Customer> {
        let new = Customer::new(input, user).map_err(|err| {
            tracing::warn!(uid = %user.uid, "invalid customer: {err}");
            err
        })?;
        let (customer, created) = self
            .conn
            .find_or_insert(|c: &Customer| c.uid == user.uid, || Ok(new))
            .await?;
        if created {
            tracing::info!(?customer, "created customer");
        } else {
            tracing::info!(?customer, "user already has a customer profile");
        }
        Ok(customer)
    }

    pub async fn patch_customer(
        &self,
        customer_id: Uuid,
        patch: CustomerPatch,
        user: &User,
    ) -> Result<Customer> {
        let customer = self
            .conn
            .update(&customer_id, |customer: &mut Customer| {
                if customer.uid != user.uid {
                    return Err(Error::BelongsToAnotherUser {
                        entity: Entity::Customer,
                    });
                }
                patch.apply(customer)
            })
            .await
            .map_err(|err| {
                tracing::warn!(%customer_id, uid = %user.uid, "cannot patch customer: {err}");
                err
            })?;
        tracing::info!(?customer, "patched customer");
        Ok(customer)
    }
}
