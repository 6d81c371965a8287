mod access;
mod login;

use std::sync::Arc;

pub use access::{AccessFilter, AccessGrant};
pub use login::LoginProvisioner;

use crate::{config::AuthConfig, db::DbPool};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub access: AccessFilter,
    pub provisioner: LoginProvisioner,
}

impl Services {
    pub fn new(db: Arc<DbPool>, auth: AuthConfig) -> Self {
        let access = AccessFilter::new(db.clone());
        let provisioner = LoginProvisioner::new(db, access.clone(), auth);
        Self {
            access,
            provisioner,
        }
    }
}
