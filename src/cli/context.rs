use std::path::Path;

use crate::adapters::accounts::system_accounts::SystemAccounts;
use crate::adapters::audit::json_audit_logger::JsonAuditLogger;
use crate::adapters::key_files::atomic_key_file_store::AtomicKeyFileStore;
use crate::config::app_config::AppConfig;
use crate::core::errors::Result;
use crate::core::services::desired_key_registry::DesiredKeyRegistry;
use crate::core::services::reconcile_service::ReconcileService;

/// Reconciliation engine wired to the real filesystem and passwd database.
pub type Engine = ReconcileService<AtomicKeyFileStore<SystemAccounts>, SystemAccounts>;

/// Everything a command needs after loading the manifest.
pub struct Context {
    pub config: AppConfig,
    pub engine: Engine,
}

impl Context {
    /// Load the manifest and build the engine.
    ///
    /// The registry is built from every declaration before any of them is
    /// reconciled, so purge declarations see all of their siblings.
    pub fn load(manifest: &Path) -> Result<Self> {
        let config = AppConfig::load(manifest)?;
        let registry = DesiredKeyRegistry::from_declarations(&config.declarations);

        let engine = ReconcileService {
            store: AtomicKeyFileStore::new(SystemAccounts),
            accounts: SystemAccounts,
            registry,
            key_file: config.settings.authorized_keys_file.clone(),
        };

        Ok(Self { config, engine })
    }

    /// The audit logger, if the manifest enables one.
    pub fn audit_logger(&self) -> Option<JsonAuditLogger> {
        self.config
            .settings
            .audit_log
            .as_deref()
            .map(JsonAuditLogger::new)
    }
}
