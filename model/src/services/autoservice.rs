use crate::{
    db::Connection,
    error::{Error, Result},
    schema::{Autoservice, AutoserviceInput, AutoservicePatch, AutoserviceUser, Permission, User},
};
use uuid::Uuid;

/// Membership of users in autoservices.
#[derive(Clone, Debug)]
pub struct AutoserviceUserService {
    conn: Connection,
}

impl AutoserviceUserService {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// The membership of `uid` in an autoservice.
    ///
    /// Fails with [`Error::NoAutoserviceAccess`] if the user is not a member.
    pub async fn get_autoservice_user(
        &self,
        uid: Uuid,
        autoservice_id: Uuid,
    ) -> Result<AutoserviceUser> {
        match self.conn.get::<AutoserviceUser>(&(uid, autoservice_id)).await {
            Ok(member) => Ok(member),
            Err(Error::NotFound { .. }) => {
                tracing::warn!(%uid, %autoservice_id, "user is not a member of autoservice");
                Err(Error::NoAutoserviceAccess)
            }
            Err(err) => Err(err),
        }
    }

    /// Make `user` the owner of `autoservice`, with every permission.
    pub async fn create_autoservice_owner(
        &self,
        autoservice: &Autoservice,
        user: &User,
    ) -> Result<AutoserviceUser> {
        let owner = self
            .conn
            .insert(AutoserviceUser::owner(autoservice.autoservice_id, user))
            .await?;
        tracing::info!(?owner, "created autoservice owner");
        Ok(owner)
    }
}

#[derive(Clone, Debug)]
pub struct AutoserviceService {
    conn: Connection,
    users: AutoserviceUserService,
}

impl AutoserviceService {
    pub fn new(conn: Connection) -> Self {
        Self {
            users: AutoserviceUserService::new(conn.clone()),
            conn,
        }
    }

    pub fn users(&self) -> &AutoserviceUserService {
        &self.users
    }

    pub async fn get_autoservice(&self, autoservice_id: Uuid) -> Result<Autoservice> {
        let autoservice = self
            .conn
            .get::<Autoservice>(&autoservice_id)
            .await
            .map_err(|err| {
                tracing::warn!(%autoservice_id, "autoservice does not exist");
                err
            })?;
        tracing::info!(?autoservice, "got autoservice");
        Ok(autoservice)
    }

    /// Register a new autoservice, owned by `user`.
    pub async fn create_autoservice(
        &self,
        input: AutoserviceInput,
        user: &User,
    ) -> Result<Autoservice> {
        let autoservice = self.conn.insert(Autoservice::new(input)?).await?;
        tracing::info!(?autoservice, "created autoservice");
        self.users.create_autoservice_owner(&autoservice, user).await?;
        Ok(autoservice)
    }

    pub async fn patch_autoservice(
        &self,
        autoservice_id: Uuid,
        patch: AutoservicePatch,
        user: &User,
    ) -> Result<Autoservice> {
        let autoservice = self.get_autoservice(autoservice_id).await?;
        self.validate_permission(&autoservice, user, Permission::Manage)
            .await?;
        let autoservice = self
            .conn
            .update(&autoservice_id, |autoservice: &mut Autoservice| {
                patch.apply(autoservice)
            })
            .await?;
        tracing::info!(?autoservice, "patched autoservice");
        Ok(autoservice)
    }

    /// Check that `user` may offer maintenance in the name of `autoservice`.
    pub async fn validate_manage_provided_maintenance(
        &self,
        autoservice: &Autoservice,
        user: &User,
    ) -> Result<()> {
        self.validate_permission(autoservice, user, Permission::ManageProvidedMaintenance)
            .await
    }

    async fn validate_permission(
        &self,
        autoservice: &Autoservice,
        user: &User,
        permission: Permission,
    ) -> Result<()> {
        let member = self
            .users
            .get_autoservice_user(user.uid, autoservice.autoservice_id)
            .await?;
        if member.has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!(
                uid = %user.uid,
                autoservice_id = %autoservice.autoservice_id,
                %permission,
                "missing permission"
            );
            Err(Error::MissingPermission { permission })
        }
    }
}
