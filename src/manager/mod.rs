//! Secrets manager core.
//!
//! [`SecretsManager`] is stateless across restarts: construction rebuilds
//! its entire view from the backing store, and [`SecretsManager::generate`]
//! is the single public write operation. Repeated calls with unchanged
//! input reconcile metadata only; a changed config, a changed rotation
//! signal, or a changed signing CA resolve to a different content-addressed
//! name and therefore a remint. Callers drive one manager per
//! reconciliation context; generate calls for distinct logical names may
//! run concurrently.

mod adopt;
mod bundle;
pub mod index;
pub mod naming;
mod options;
mod signer;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::crypto::SecretSource;
use crate::domain::{label, ManagedSecret, RotationStrategy, SecretConfig, MANAGED_BY_VALUE};
use crate::errors::{Result, TrustplaneError};
use crate::storage::ObjectStore;
use crate::utils::Clock;

use index::StoreIndex;

pub use index::SecretSet;
pub use options::GenerateOptions;

/// Issues, persists, and rotates credential material for one namespace.
pub struct SecretsManager {
    clock: Arc<dyn Clock>,
    source: Arc<dyn SecretSource>,
    store: Arc<dyn ObjectStore>,
    namespace: String,
    identity: String,
    /// Externally signaled rotation instants, rendered as label values.
    rotation_labels: HashMap<String, String>,
    index: StoreIndex,
}

impl std::fmt::Debug for SecretsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsManager")
            .field("namespace", &self.namespace)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl SecretsManager {
    /// Construct a manager and rebuild its view from the backing store.
    ///
    /// `last_rotation_initiation_times` is the sole external signal that
    /// forces a logical name's fingerprint to change while its config stays
    /// byte-identical; it is how an operator's rotate-now request reaches
    /// this otherwise stateless component.
    pub async fn new(
        clock: Arc<dyn Clock>,
        source: Arc<dyn SecretSource>,
        store: Arc<dyn ObjectStore>,
        namespace: impl Into<String>,
        identity: impl Into<String>,
        last_rotation_initiation_times: HashMap<String, DateTime<Utc>>,
    ) -> Result<Self> {
        let namespace = namespace.into();
        let identity = identity.into();
        if identity.is_empty() {
            return Err(TrustplaneError::validation_field(
                "manager identity must not be empty",
                "identity",
            ));
        }

        let rotation_labels: HashMap<String, String> = last_rotation_initiation_times
            .into_iter()
            .map(|(name, instant)| (name, instant.timestamp().to_string()))
            .collect();

        let index = StoreIndex::load(store.as_ref(), &namespace, &identity, &rotation_labels).await?;
        info!(namespace = %namespace, identity = %identity, "Rebuilt secrets manager view from backing store");

        Ok(Self { clock, source, store, namespace, identity, rotation_labels, index })
    }

    /// Get or mint the secret for a config, per the options' effects.
    #[instrument(
        skip(self, config, options),
        fields(name = %config.name(), kind = config.kind_str()),
        name = "generate_secret"
    )]
    pub async fn generate(
        &self,
        config: &SecretConfig,
        options: GenerateOptions,
    ) -> Result<ManagedSecret> {
        config.validate()?;
        let logical = config.name();

        if config.requires_signer() && options.signed_by_ca.is_none() {
            return Err(TrustplaneError::validation(format!(
                "'{logical}' needs a signing CA; declare one with signed_by_ca"
            )));
        }
        if options.signed_by_ca.is_some() && !config.requires_signer() {
            return Err(TrustplaneError::validation(format!(
                "'{logical}' does not take a signing CA"
            )));
        }

        // The signer resolves before fingerprinting: which CA generation
        // signs is itself part of what determines the dependent's name.
        let resolved_signer = match &options.signed_by_ca {
            Some(dependency) => {
                Some(signer::resolve(&self.index, &dependency.name, dependency.use_current_ca)?)
            }
            None => None,
        };

        let rotation_label = self.rotation_labels.get(logical).cloned().unwrap_or_default();
        let checksum = naming::fingerprint(
            config,
            &rotation_label,
            resolved_signer.as_ref().map(|s| s.checksum.as_str()),
        )?;
        let name =
            naming::resource_name(config, &checksum, options.ignore_config_checksum_for_ca_name);

        let prior = self.index.lookup_entry(logical);
        let lifetime = config.lifetime(options.validity);

        let existing = match &prior.current {
            Some(current) if current.name == name => Some(current.clone()),
            _ => self
                .store
                .get(&self.namespace, &name)
                .await
                .map_err(|e| TrustplaneError::store(e, format!("read secret '{name}'")))?,
        };

        let secret = match existing {
            Some(record) => {
                self.reconcile_metadata(record, logical, &checksum, &rotation_label, lifetime, &options)
                    .await?
            }
            None => {
                let mut data = config.mint(
                    self.source.as_ref(),
                    self.clock.as_ref(),
                    resolved_signer.as_ref().map(|s| &s.material),
                )?;
                adopt::apply_legacy_overrides(
                    config,
                    &mut data,
                    self.store.as_ref(),
                    &self.namespace,
                    &self.identity,
                )
                .await?;

                let record =
                    self.new_record(logical, &name, &checksum, &rotation_label, lifetime, &options, data);
                let created = self
                    .store
                    .create(record)
                    .await
                    .map_err(|e| TrustplaneError::store(e, format!("create secret '{name}'")))?;
                info!(secret = %name, "Minted new secret material");
                created
            }
        };

        // The strategy decides the old slot anew on every call: an in-place
        // rotation discards the superseded generation from the view, keep-old
        // demotes it (or carries a generation the index load classified as
        // superseded, after a rotation signal changed).
        let old = match options.rotation {
            RotationStrategy::InPlace => None,
            RotationStrategy::KeepOld if options.ignore_old_secrets => None,
            RotationStrategy::KeepOld => match &prior.current {
                Some(previous) if previous.name != secret.name => Some(previous.clone()),
                _ => prior.old.clone(),
            },
        };

        let bundle = if config.is_ca() {
            Some(
                self.reconcile_bundle(
                    logical,
                    &rotation_label,
                    &secret,
                    old.as_ref(),
                    prior.bundle.clone(),
                )
                .await?,
            )
        } else {
            None
        };

        self.index
            .record(logical, index::IndexEntry { current: Some(secret.clone()), old, bundle });
        Ok(secret)
    }

    /// Current secret for a logical name, from the in-memory view.
    pub fn get(&self, logical_name: &str) -> Option<ManagedSecret> {
        self.index.lookup(logical_name).map(|set| set.current)
    }

    /// Full {current, old, bundle} view for a logical name.
    pub fn lookup(&self, logical_name: &str) -> Option<SecretSet> {
        self.index.lookup(logical_name)
    }

    fn expected_metadata(
        &self,
        logical: &str,
        checksum: &str,
        rotation_label: &str,
        issued_at: i64,
        lifetime: Option<Duration>,
        persist: bool,
    ) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
        let mut labels = BTreeMap::new();
        labels.insert(label::MANAGED_BY.to_string(), MANAGED_BY_VALUE.to_string());
        labels.insert(label::MANAGER_IDENTITY.to_string(), self.identity.clone());
        labels.insert(label::NAME.to_string(), logical.to_string());
        labels.insert(label::CHECKSUM.to_string(), checksum.to_string());
        labels
            .insert(label::LAST_ROTATION_INITIATION_TIME.to_string(), rotation_label.to_string());
        labels.insert(label::ISSUED_AT_TIME.to_string(), issued_at.to_string());

        let mut annotations = BTreeMap::new();
        annotations.insert(label::ISSUED_AT_TIME.to_string(), issued_at.to_string());

        if let Some(lifetime) = lifetime {
            let valid_until = issued_at + lifetime.as_secs() as i64;
            labels.insert(label::VALID_UNTIL_TIME.to_string(), valid_until.to_string());
            annotations.insert(label::VALID_UNTIL_TIME.to_string(), valid_until.to_string());
        }
        if persist {
            labels.insert(label::PERSIST.to_string(), "true".to_string());
        }
        (labels, annotations)
    }

    fn new_record(
        &self,
        logical: &str,
        name: &str,
        checksum: &str,
        rotation_label: &str,
        lifetime: Option<Duration>,
        options: &GenerateOptions,
        data: BTreeMap<String, Vec<u8>>,
    ) -> ManagedSecret {
        let issued_at = self.clock.now().timestamp();
        let (labels, annotations) =
            self.expected_metadata(logical, checksum, rotation_label, issued_at, lifetime, options.persist);

        let mut record = ManagedSecret::new(name, self.namespace.clone());
        record.data = data;
        record.labels = labels;
        record.annotations = annotations;
        record.immutable = true;
        record
    }

    /// Re-apply expected labels, annotations, and the immutable flag onto a
    /// record without touching its data. The original issue time is
    /// preserved so the expiry never walks forward, and an established
    /// `persist` marker stays sticky. `None` when nothing drifted.
    fn desired_metadata(
        &self,
        record: &ManagedSecret,
        logical: &str,
        checksum: &str,
        rotation_label: &str,
        lifetime: Option<Duration>,
        options: &GenerateOptions,
    ) -> Option<ManagedSecret> {
        let issued_at = record.issued_at().unwrap_or_else(|| self.clock.now().timestamp());
        let persist = options.persist || record.label(label::PERSIST) == Some("true");
        let (labels, annotations) =
            self.expected_metadata(logical, checksum, rotation_label, issued_at, lifetime, persist);

        if record.labels == labels && record.annotations == annotations && record.immutable {
            return None;
        }

        let mut desired = record.clone();
        desired.labels = labels;
        desired.annotations = annotations;
        desired.immutable = true;
        Some(desired)
    }

    /// Metadata-only reconciliation of an existing record. Safe to run
    /// every tick: an undrifted record issues no store write at all.
    async fn reconcile_metadata(
        &self,
        record: ManagedSecret,
        logical: &str,
        checksum: &str,
        rotation_label: &str,
        lifetime: Option<Duration>,
        options: &GenerateOptions,
    ) -> Result<ManagedSecret> {
        if self
            .desired_metadata(&record, logical, checksum, rotation_label, lifetime, options)
            .is_none()
        {
            return Ok(record);
        }

        // Drifted per the in-memory view; reconcile against the store's own
        // copy so the conditional update carries a fresh version token.
        let name = record.name.clone();
        let fresh = self
            .store
            .get(&self.namespace, &name)
            .await
            .map_err(|e| TrustplaneError::store(e, format!("read secret '{name}'")))?
            .unwrap_or(record);

        match self.desired_metadata(&fresh, logical, checksum, rotation_label, lifetime, options) {
            None => Ok(fresh),
            Some(desired) => {
                let updated = self
                    .store
                    .update(desired)
                    .await
                    .map_err(|e| TrustplaneError::store(e, format!("reconcile secret '{name}'")))?;
                debug!(secret = %name, "Reconciled drifted secret metadata");
                Ok(updated)
            }
        }
    }

    /// Ensure the bundle record matches the still-present CA set.
    async fn reconcile_bundle(
        &self,
        logical: &str,
        rotation_label: &str,
        current: &ManagedSecret,
        old: Option<&ManagedSecret>,
        prior_bundle: Option<ManagedSecret>,
    ) -> Result<ManagedSecret> {
        let desired = bundle::desired_bundle(
            &self.namespace,
            &self.identity,
            logical,
            rotation_label,
            self.clock.now().timestamp(),
            current,
            old,
        )?;

        if let Some(existing) = prior_bundle {
            if existing.name == desired.name {
                return Ok(existing);
            }
        }
        if let Some(found) = self
            .store
            .get(&self.namespace, &desired.name)
            .await
            .map_err(|e| TrustplaneError::store(e, format!("read bundle '{}'", desired.name)))?
        {
            return Ok(found);
        }

        let name = desired.name.clone();
        let created = self
            .store
            .create(desired)
            .await
            .map_err(|e| TrustplaneError::store(e, format!("create bundle '{name}'")))?;
        info!(bundle = %name, ca = %logical, "Rebuilt trust bundle");
        Ok(created)
    }
}
