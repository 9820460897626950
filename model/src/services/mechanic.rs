use crate::{
    db::Connection,
    error::{Entity, Error, Result},
    schema::{Mechanic, MechanicInput, MechanicPatch, User},
};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct MechanicService {
    conn: Connection,
}

impl MechanicService {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub async fn get_mechanic(&self, mechanic_id: Uuid) -> Result<Mechanic> {
        let mechanic = self.conn.get::<Mechanic>(&mechanic_id).await.map_err(|err| {
            tracing::warn!(%mechanic_id, "mechanic does not exist");
            err
        })?;
        tracing::info!(?mechanic, "got mechanic");
        Ok(mechanic)
    }

    /// Create the mechanic profile of `user`.
    ///
    /// A user has at most one mechanic profile. If `user` already has one, it is returned as is
    /// and `input` is ignored, though it must still be valid.
    pub async fn create_mechanic(&self, input: MechanicInput, user: &User) -> Result<Mechanic> {
        let new = Mechanic::new(input, user).map_err(|err| {
            tracing::warn!(uid = %user.uid, "invalid mechanic: {err}");
            err
        })?;
        let (mechanic, created) = self
            .conn
            .find_or_insert(|m: &Mechanic| m.uid == user.uid, || Ok(new))
            .await?;
        if created {
            tracing::info!(?mechanic, "created mechanic");
        } else {
            tracing::info!(?mechanic, "user already has a mechanic profile");
        }
        Ok(mechanic)
    }

    pub async fn patch_mechanic(
        &self,
        mechanic_id: Uuid,
        patch: MechanicPatch,
        user: &User,
    ) -> Result<Mechanic> {
        let mechanic = self
            .conn
            .update(&mechanic_id, |mechanic: &mut Mechanic| {
                Self::validate_mechanic_owner(mechanic, user)?;
                patch.apply(mechanic)
            })
            .await
            .map_err(|err| {
                tracing::warn!(%mechanic_id, uid = %user.uid, "cannot patch mechanic: {err}");
                err
            })?;
        tracing::info!(?mechanic, "patched mechanic");
        Ok(mechanic)
    }

    /// Check that `mechanic` is the profile of `user`.
    pub fn validate_mechanic_owner(mechanic: &Mechanic, user: &User) -> Result<()> {
        if mechanic.uid == user.uid {
            Ok(())
        } else {
            tracing::warn!(
                mechanic_id = %mechanic.mechanic_id,
                uid = %user.uid,
                "mechanic belongs to another user"
            );
            Err(Error::BelongsToAnotherUser {
                entity: Entity::Mechanic,
            })
        }
    }
}
