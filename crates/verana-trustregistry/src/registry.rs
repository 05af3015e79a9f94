use serde::{Deserialize, Serialize};
use verana_core::{
    ensure_gov_authority, resolve_response_max_size, validate_address, validate_did,
    validate_language, Collection, Context, Event, Item, Sequence, Timestamp,
};
use verana_trustdeposit::TrustDepositLedger;

use crate::error::TrustRegistryError;
use crate::types::{
    GenesisState, GovernanceFrameworkDocument, GovernanceFrameworkVersion,
    MsgAddGovernanceFrameworkDocument, MsgCreateTrustRegistry, MsgUpdateTrustRegistry, Params,
    TrustRegistry, TrustRegistryView, VersionView,
};

pub const MODULE_NAME: &str = "trustregistry";

const PARAMS: Item<Params> = Item::new(MODULE_NAME, 0x00);
const REGISTRIES: Collection<u64, TrustRegistry> = Collection::new(MODULE_NAME, 0x01);
const DID_INDEX: Collection<str, u64> = Collection::new(MODULE_NAME, 0x02);
const VERSIONS: Collection<u64, GovernanceFrameworkVersion> = Collection::new(MODULE_NAME, 0x03);
const DOCUMENTS: Collection<u64, GovernanceFrameworkDocument> =
    Collection::new(MODULE_NAME, 0x04);
/// `(tr_id, version) → gfv_id`
const VERSION_INDEX: Collection<(u64, u64), u64> = Collection::new(MODULE_NAME, 0x05);
/// `(gfv_id, language) → gfd_id`
const DOCUMENT_INDEX: Collection<(u64, String), u64> = Collection::new(MODULE_NAME, 0x06);
const REGISTRY_SEQ: Sequence = Sequence::new(MODULE_NAME, 0x10);
const VERSION_SEQ: Sequence = Sequence::new(MODULE_NAME, 0x11);
const DOCUMENT_SEQ: Sequence = Sequence::new(MODULE_NAME, 0x12);

/// Filters of `ListTrustRegistries`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListTrustRegistriesRequest {
    pub controller: Option<String>,
    pub modified_after: Option<Timestamp>,
    pub active_gf_only: bool,
    pub preferred_language: Option<String>,
    /// `0` selects the default page size.
    pub response_max_size: u32,
}

/// Trust registry state machine.
#[derive(Clone)]
pub struct TrustRegistryManager {
    trust_deposit: TrustDepositLedger,
}

impl TrustRegistryManager {
    pub fn new(trust_deposit: TrustDepositLedger) -> Self {
        Self { trust_deposit }
    }

    pub fn params(&self, ctx: &Context<'_>) -> Result<Params, TrustRegistryError> {
        Ok(PARAMS.get(ctx)?.unwrap_or_else(Params::default_params))
    }

    /// Price of one trust unit in base coins.
    pub fn trust_unit_price(&self, ctx: &Context<'_>) -> Result<u64, TrustRegistryError> {
        Ok(self.params(ctx)?.trust_unit_price)
    }

    pub fn update_params(
        &self,
        ctx: &mut Context<'_>,
        authority: &str,
        params: Params,
    ) -> Result<(), TrustRegistryError> {
        ensure_gov_authority(authority)?;
        params.validate()?;
        PARAMS.set(ctx, &params);
        tracing::info!(module = MODULE_NAME, "params updated");
        Ok(())
    }

    /// Create a registry with version 1 of its governance framework and
    /// one document in the registry's language. Returns the new id.
    pub fn create_trust_registry(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgCreateTrustRegistry,
    ) -> Result<u64, TrustRegistryError> {
        validate_address(&msg.creator)?;
        validate_did(&msg.did)?;
        validate_language(&msg.language)?;
        validate_document(&msg.doc_url, &msg.doc_hash)?;
        if DID_INDEX.has(ctx, &msg.did)? {
            return Err(TrustRegistryError::AlreadyExists(msg.did.clone()));
        }

        let params = self.params(ctx)?;
        let deposit = params
            .trust_registry_trust_deposit
            .checked_mul(params.trust_unit_price)
            .ok_or_else(|| TrustRegistryError::InvalidRequest("deposit overflows".into()))?;
        self.trust_deposit
            .adjust_trust_deposit(ctx, &msg.creator, to_delta(deposit)?)?;

        let now = ctx.block_time();
        let id = REGISTRY_SEQ.next(ctx)?;
        let registry = TrustRegistry {
            id,
            did: msg.did.clone(),
            controller: msg.creator.clone(),
            created: now,
            modified: now,
            archived: None,
            deposit,
            aka: msg.aka.clone(),
            active_version: 1,
            language: msg.language.clone(),
        };
        REGISTRIES.set(ctx, &id, &registry);
        DID_INDEX.set(ctx, &msg.did, &id);

        let gfv_id = self.insert_version(ctx, id, 1, Some(now))?;
        self.insert_document(ctx, gfv_id, &msg.language, &msg.doc_url, &msg.doc_hash)?;

        ctx.emit(
            Event::new("create_trust_registry")
                .attr("trust_registry_id", id)
                .attr("did", &msg.did)
                .attr("controller", &msg.creator)
                .attr("aka", &msg.aka)
                .attr("language", &msg.language)
                .attr("deposit", deposit)
                .attr("timestamp", now),
        );
        tracing::info!(id, did = %msg.did, creator = %msg.creator, "trust registry created");
        Ok(id)
    }

    /// Add a document to the latest version, or start the next version.
    pub fn add_governance_framework_document(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgAddGovernanceFrameworkDocument,
    ) -> Result<(), TrustRegistryError> {
        validate_language(&msg.doc_language)?;
        validate_document(&msg.doc_url, &msg.doc_hash)?;
        let mut registry = self.load_controlled(ctx, msg.id, &msg.creator)?;

        let max_version = self.max_version(ctx, msg.id)?;
        if msg.version != max_version && msg.version != max_version + 1 {
            return Err(TrustRegistryError::InvalidRequest(format!(
                "version must be {} or {}, got {}",
                max_version,
                max_version + 1,
                msg.version
            )));
        }
        if msg.version <= registry.active_version {
            return Err(TrustRegistryError::InvalidRequest(format!(
                "version {} must exceed active version {}",
                msg.version, registry.active_version
            )));
        }

        let gfv_id = match VERSION_INDEX.get(ctx, &(msg.id, msg.version as u64))? {
            Some(gfv_id) => gfv_id,
            None => self.insert_version(ctx, msg.id, msg.version, None)?,
        };
        self.insert_document(ctx, gfv_id, &msg.doc_language, &msg.doc_url, &msg.doc_hash)?;

        registry.modified = ctx.block_time();
        REGISTRIES.set(ctx, &registry.id, &registry);
        tracing::info!(
            id = msg.id,
            version = msg.version,
            language = %msg.doc_language,
            "governance framework document added"
        );
        Ok(())
    }

    /// Activate the next governance framework version.
    pub fn increase_active_gf_version(
        &self,
        ctx: &mut Context<'_>,
        creator: &str,
        id: u64,
    ) -> Result<(), TrustRegistryError> {
        let mut registry = self.load_controlled(ctx, id, creator)?;
        let next = registry.active_version + 1;
        let gfv_id = VERSION_INDEX
            .get(ctx, &(id, next as u64))?
            .ok_or_else(|| {
                TrustRegistryError::NotFound(format!("governance framework version {}", next))
            })?;
        if !DOCUMENT_INDEX.has(ctx, &(gfv_id, registry.language.clone()))? {
            return Err(TrustRegistryError::InvalidState(format!(
                "version {} has no document in language {}",
                next, registry.language
            )));
        }
        let mut version = VERSIONS
            .get(ctx, &gfv_id)?
            .ok_or_else(|| TrustRegistryError::NotFound(format!("version {}", gfv_id)))?;

        let now = ctx.block_time();
        version.active_since = Some(now);
        VERSIONS.set(ctx, &gfv_id, &version);
        registry.active_version = next;
        registry.modified = now;
        REGISTRIES.set(ctx, &id, &registry);

        ctx.emit(
            Event::new("increase_active_governance_framework_version")
                .attr("trust_registry_id", id)
                .attr("version", next)
                .attr("timestamp", now),
        );
        tracing::info!(id, version = next, "governance framework version activated");
        Ok(())
    }

    /// Update the DID and aka of a registry.
    pub fn update_trust_registry(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgUpdateTrustRegistry,
    ) -> Result<(), TrustRegistryError> {
        validate_did(&msg.did)?;
        let mut registry = self.load_controlled(ctx, msg.id, &msg.creator)?;
        if msg.did != registry.did {
            if DID_INDEX.has(ctx, &msg.did)? {
                return Err(TrustRegistryError::AlreadyExists(msg.did.clone()));
            }
            DID_INDEX.remove(ctx, &registry.did);
            DID_INDEX.set(ctx, &msg.did, &registry.id);
            registry.did = msg.did.clone();
        }
        registry.aka = msg.aka.clone();
        registry.modified = ctx.block_time();
        REGISTRIES.set(ctx, &registry.id, &registry);

        ctx.emit(
            Event::new("update_trust_registry")
                .attr("trust_registry_id", registry.id)
                .attr("did", &registry.did),
        );
        tracing::info!(id = registry.id, did = %registry.did, "trust registry updated");
        Ok(())
    }

    /// Archive or unarchive a registry.
    pub fn archive_trust_registry(
        &self,
        ctx: &mut Context<'_>,
        creator: &str,
        id: u64,
        archive: bool,
    ) -> Result<(), TrustRegistryError> {
        let mut registry = self.load_owned(ctx, id, creator)?;
        match (archive, registry.archived.is_some()) {
            (true, true) => {
                return Err(TrustRegistryError::InvalidState(format!(
                    "trust registry {} is already archived",
                    id
                )))
            }
            (false, false) => {
                return Err(TrustRegistryError::InvalidState(format!(
                    "trust registry {} is not archived",
                    id
                )))
            }
            _ => {}
        }
        let now = ctx.block_time();
        registry.archived = archive.then_some(now);
        registry.modified = now;
        REGISTRIES.set(ctx, &id, &registry);
        ctx.emit(
            Event::new("archive_trust_registry")
                .attr("trust_registry_id", id)
                .attr("archive", archive),
        );
        tracing::info!(id, archive, "trust registry archive flag changed");
        Ok(())
    }

    pub fn get_trust_registry(
        &self,
        ctx: &Context<'_>,
        id: u64,
    ) -> Result<Option<TrustRegistry>, TrustRegistryError> {
        Ok(REGISTRIES.get(ctx, &id)?)
    }

    /// Registry id registered for `did`.
    pub fn find_id_by_did(&self, ctx: &Context<'_>, did: &str) -> Result<Option<u64>, TrustRegistryError> {
        Ok(DID_INDEX.get(ctx, did)?)
    }

    /// A registry with its versions and documents.
    ///
    /// With a preferred language, each version lists only documents in that
    /// language, or its first document when it has none.
    pub fn get_trust_registry_view(
        &self,
        ctx: &Context<'_>,
        id: u64,
        active_gf_only: bool,
        preferred_language: Option<&str>,
    ) -> Result<TrustRegistryView, TrustRegistryError> {
        let registry = REGISTRIES
            .get(ctx, &id)?
            .ok_or_else(|| TrustRegistryError::NotFound(id.to_string()))?;
        self.view(ctx, registry, active_gf_only, preferred_language)
    }

    /// Same as [`Self::get_trust_registry_view`], looked up by DID.
    pub fn get_trust_registry_view_by_did(
        &self,
        ctx: &Context<'_>,
        did: &str,
        active_gf_only: bool,
        preferred_language: Option<&str>,
    ) -> Result<TrustRegistryView, TrustRegistryError> {
        let id = self
            .find_id_by_did(ctx, did)?
            .ok_or_else(|| TrustRegistryError::NotFound(did.to_string()))?;
        self.get_trust_registry_view(ctx, id, active_gf_only, preferred_language)
    }

    pub fn list_trust_registries(
        &self,
        ctx: &Context<'_>,
        req: &ListTrustRegistriesRequest,
    ) -> Result<Vec<TrustRegistryView>, TrustRegistryError> {
        let limit = resolve_response_max_size(req.response_max_size)?;
        let mut registries: Vec<TrustRegistry> = REGISTRIES
            .values(ctx)?
            .into_iter()
            .filter(|tr| req.controller.as_ref().map_or(true, |c| &tr.controller == c))
            .filter(|tr| req.modified_after.map_or(true, |t| tr.modified > t))
            .collect();
        registries.sort_by(|a, b| a.modified.cmp(&b.modified).then(a.id.cmp(&b.id)));
        registries
            .into_iter()
            .take(limit)
            .map(|tr| {
                self.view(
                    ctx,
                    tr,
                    req.active_gf_only,
                    req.preferred_language.as_deref(),
                )
            })
            .collect()
    }

    fn view(
        &self,
        ctx: &Context<'_>,
        registry: TrustRegistry,
        active_gf_only: bool,
        preferred_language: Option<&str>,
    ) -> Result<TrustRegistryView, TrustRegistryError> {
        let mut versions = Vec::new();
        for gfv_id in VERSION_INDEX.prefixed_values(ctx, &registry.id)? {
            let Some(version) = VERSIONS.get(ctx, &gfv_id)? else {
                continue;
            };
            if active_gf_only && version.version != registry.active_version {
                continue;
            }
            let mut documents = Vec::new();
            for gfd_id in DOCUMENT_INDEX.prefixed_values(ctx, &gfv_id)? {
                if let Some(doc) = DOCUMENTS.get(ctx, &gfd_id)? {
                    documents.push(doc);
                }
            }
            documents.sort_by_key(|d| d.id);
            if let Some(lang) = preferred_language {
                let preferred: Vec<_> = documents
                    .iter()
                    .filter(|d| d.language == lang)
                    .cloned()
                    .collect();
                documents = if preferred.is_empty() {
                    documents.into_iter().take(1).collect()
                } else {
                    preferred
                };
            }
            versions.push(VersionView { version, documents });
        }
        Ok(TrustRegistryView {
            trust_registry: registry,
            versions,
        })
    }

    pub fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &GenesisState,
    ) -> Result<(), TrustRegistryError> {
        genesis.params.validate()?;
        PARAMS.set(ctx, &genesis.params);
        let mut max_tr = 0;
        for tr in &genesis.trust_registries {
            REGISTRIES.set(ctx, &tr.id, tr);
            DID_INDEX.set(ctx, &tr.did, &tr.id);
            max_tr = max_tr.max(tr.id);
        }
        let mut max_gfv = 0;
        for gfv in &genesis.governance_framework_versions {
            VERSIONS.set(ctx, &gfv.id, gfv);
            VERSION_INDEX.set(ctx, &(gfv.tr_id, gfv.version as u64), &gfv.id);
            max_gfv = max_gfv.max(gfv.id);
        }
        let mut max_gfd = 0;
        for gfd in &genesis.governance_framework_documents {
            DOCUMENTS.set(ctx, &gfd.id, gfd);
            DOCUMENT_INDEX.set(ctx, &(gfd.gfv_id, gfd.language.clone()), &gfd.id);
            max_gfd = max_gfd.max(gfd.id);
        }
        REGISTRY_SEQ.set(ctx, max_tr + 1);
        VERSION_SEQ.set(ctx, max_gfv + 1);
        DOCUMENT_SEQ.set(ctx, max_gfd + 1);
        tracing::info!(
            registries = genesis.trust_registries.len(),
            "trust registry genesis loaded"
        );
        Ok(())
    }

    pub fn export_genesis(&self, ctx: &Context<'_>) -> Result<GenesisState, TrustRegistryError> {
        Ok(GenesisState {
            params: self.params(ctx)?,
            trust_registries: REGISTRIES.values(ctx)?,
            governance_framework_versions: VERSIONS.values(ctx)?,
            governance_framework_documents: DOCUMENTS.values(ctx)?,
        })
    }

    fn load_owned(
        &self,
        ctx: &Context<'_>,
        id: u64,
        caller: &str,
    ) -> Result<TrustRegistry, TrustRegistryError> {
        let registry = REGISTRIES
            .get(ctx, &id)?
            .ok_or_else(|| TrustRegistryError::NotFound(id.to_string()))?;
        if registry.controller != caller {
            tracing::warn!(id, caller, "trust registry call rejected: not the controller");
            return Err(TrustRegistryError::Unauthorized {
                id,
                caller: caller.to_string(),
            });
        }
        Ok(registry)
    }

    /// Load a registry the caller controls and that is not archived.
    fn load_controlled(
        &self,
        ctx: &Context<'_>,
        id: u64,
        caller: &str,
    ) -> Result<TrustRegistry, TrustRegistryError> {
        let registry = self.load_owned(ctx, id, caller)?;
        if registry.archived.is_some() {
            return Err(TrustRegistryError::InvalidState(format!(
                "trust registry {} is archived",
                id
            )));
        }
        Ok(registry)
    }

    fn max_version(&self, ctx: &Context<'_>, tr_id: u64) -> Result<i32, TrustRegistryError> {
        let mut max = 0;
        for gfv_id in VERSION_INDEX.prefixed_values(ctx, &tr_id)? {
            if let Some(v) = VERSIONS.get(ctx, &gfv_id)? {
                max = max.max(v.version);
            }
        }
        Ok(max)
    }

    fn insert_version(
        &self,
        ctx: &mut Context<'_>,
        tr_id: u64,
        version: i32,
        active_since: Option<Timestamp>,
    ) -> Result<u64, TrustRegistryError> {
        let id = VERSION_SEQ.next(ctx)?;
        let now = ctx.block_time();
        let gfv = GovernanceFrameworkVersion {
            id,
            tr_id,
            created: now,
            version,
            active_since,
        };
        VERSIONS.set(ctx, &id, &gfv);
        VERSION_INDEX.set(ctx, &(tr_id, version as u64), &id);
        ctx.emit(
            Event::new("create_governance_framework_version")
                .attr("id", id)
                .attr("trust_registry_id", tr_id)
                .attr("version", version),
        );
        tracing::debug!(id, tr_id, version, "governance framework version created");
        Ok(id)
    }

    fn insert_document(
        &self,
        ctx: &mut Context<'_>,
        gfv_id: u64,
        language: &str,
        url: &str,
        hash: &str,
    ) -> Result<u64, TrustRegistryError> {
        let index_key = (gfv_id, language.to_string());
        if DOCUMENT_INDEX.has(ctx, &index_key)? {
            return Err(TrustRegistryError::AlreadyExists(format!(
                "document in language {} for version {}",
                language, gfv_id
            )));
        }
        let id = DOCUMENT_SEQ.next(ctx)?;
        let gfd = GovernanceFrameworkDocument {
            id,
            gfv_id,
            created: ctx.block_time(),
            language: language.to_string(),
            url: url.to_string(),
            hash: hash.to_string(),
        };
        DOCUMENTS.set(ctx, &id, &gfd);
        DOCUMENT_INDEX.set(ctx, &index_key, &id);
        ctx.emit(
            Event::new("create_governance_framework_document")
                .attr("id", id)
                .attr("gfv_id", gfv_id)
                .attr("language", language)
                .attr("url", url),
        );
        tracing::debug!(id, gfv_id, language, "governance framework document created");
        Ok(id)
    }
}

fn validate_document(url: &str, hash: &str) -> Result<(), TrustRegistryError> {
    if url.trim().is_empty() {
        return Err(TrustRegistryError::InvalidRequest("document url is required".into()));
    }
    if hash.trim().is_empty() {
        return Err(TrustRegistryError::InvalidRequest("document hash is required".into()));
    }
    Ok(())
}

fn to_delta(amount: u64) -> Result<i64, TrustRegistryError> {
    i64::try_from(amount)
        .map_err(|_| TrustRegistryError::InvalidRequest(format!("amount {} too large", amount)))
}
