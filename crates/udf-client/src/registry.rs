//! Client-side UDF module registry.
//!
//! # Architecture
//!
//! ## The Flow
//!
//! ```text
//! put(session, "udf/avg.lua", Lua, policy)
//! ├── language supported?            else UnsupportedLanguage
//! ├── session open?                  else NotConnected
//! ├── name = "avg.lua"               (final path component)
//! ├── ModuleBlobReader::read         FileNotFound / ModuleTooLarge
//! ├── transport.submit_module        else RegistrationFailed
//! └── ConvergenceWaiter::wait        else ConvergenceTimeout
//!
//! remove / list / get
//! ├── session open?                  else NotConnected
//! └── one transport call             translated per operation
//! ```
//!
//! The module name is the file name only. Two files called `avg.lua` in
//! different directories register under the same name, and the later put
//! replaces the earlier one.
//!
//! A put that times out waiting for convergence is not rolled back: the
//! cluster accepted it, it just was not confirmed everywhere in time.
//! Remove does not wait for convergence at all.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tracing::{debug, info};
use udf_common::{
    Error, ModuleName, Result, ResultExt, UdfFileSummary, UdfLanguage, UdfModule,
};

use crate::blob::ModuleBlobReader;
use crate::convergence::{Converged, ConvergenceWaiter};
use crate::policy::InfoPolicy;
use crate::session::Session;
use crate::translate::{translate, Operation};

/// One put in progress. Owned by the calling operation only.
#[derive(Debug)]
pub struct RegistrationRequest {
    pub module: UdfModule,
    pub policy: InfoPolicy,
    pub submitted_at: Instant,
}

impl RegistrationRequest {
    pub fn new(module: UdfModule, policy: InfoPolicy) -> Self {
        Self {
            module,
            policy,
            submitted_at: Instant::now(),
        }
    }
}

/// Entry point for registering, removing, listing and fetching modules.
///
/// # Rust Learning Note
///
/// The registry keeps no module state: every `list` and `get` asks the
/// cluster. The only state is a pair of counters (`AtomicUsize`) so the
/// same registry can be shared by concurrent tasks through `&self`.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    in_flight: AtomicUsize,
    converged: AtomicUsize,
}

/// Decrements the in-flight counter on every exit path.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of puts currently submitting or waiting for convergence.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Number of puts that were confirmed on every node.
    pub fn converged(&self) -> usize {
        self.converged.load(Ordering::SeqCst)
    }

    /// Registers the file at `path` under its file name and waits until
    /// every node reports the new content.
    pub async fn put(
        &self,
        session: &Session,
        path: impl AsRef<Path>,
        language: UdfLanguage,
        policy: &InfoPolicy,
    ) -> Result<()> {
        let path = path.as_ref();

        language.ensure_supported()?;
        session.transport()?;
        let name = ModuleName::from_path(path)?;

        let reader = ModuleBlobReader::new(session.defaults().max_module_size);
        let content = reader.read(path).await.in_module(name.as_str())?;

        debug!(module = %name, path = %path.display(), bytes = content.len(), "Read UDF module");
        self.register(session, UdfModule::new(name, language, content), policy)
            .await
    }

    /// Registers in-memory `content` under `name`, with the same checks and
    /// convergence wait as [`ModuleRegistry::put`].
    pub async fn put_bytes(
        &self,
        session: &Session,
        name: &str,
        language: UdfLanguage,
        content: Vec<u8>,
        policy: &InfoPolicy,
    ) -> Result<()> {
        language.ensure_supported()?;
        session.transport()?;
        let name = ModuleName::new(name)?;

        ModuleBlobReader::new(session.defaults().max_module_size)
            .check_size(name.as_str(), content.len() as u64)
            .in_module(name.as_str())?;

        self.register(session, UdfModule::new(name, language, content), policy)
            .await
    }

    async fn register(&self, session: &Session, module: UdfModule, policy: &InfoPolicy) -> Result<()> {
        let name = module.name().to_string();
        let request = RegistrationRequest::new(module, *policy);

        self.submit(session, &request).await.in_module(&name)?;
        Ok(())
    }

    async fn submit(&self, session: &Session, request: &RegistrationRequest) -> Result<Converged> {
        let _in_flight = InFlight::enter(&self.in_flight);

        let transport = session.transport()?;
        let timeout = request.policy.resolve_timeout(session.defaults().info_timeout)?;
        let module = &request.module;
        let name = module.name().as_str();

        transport
            .submit_module(name, module.language(), module.content(), timeout)
            .await
            .map_err(|e| translate(Operation::Submit, Some(name), e))?;

        info!(
            module = name,
            hash = %module.content_hash(),
            bytes = module.content().len(),
            "UDF module submitted"
        );

        let converged = ConvergenceWaiter::new(transport, session.defaults().convergence)
            .wait(name, module.content_hash())
            .await?;

        self.converged.fetch_add(1, Ordering::SeqCst);
        debug!(
            module = name,
            "Registration completed {:?} after submission",
            request.submitted_at.elapsed()
        );
        Ok(converged)
    }

    /// Removes a module. Absence is reported as `ModuleNotFound`.
    pub async fn remove(&self, session: &Session, name: &str, policy: &InfoPolicy) -> Result<()> {
        let transport = session.transport().in_module(name)?;
        let timeout = policy
            .resolve_timeout(session.defaults().info_timeout)
            .in_module(name)?;
        ModuleName::new(name).in_module(name)?;

        transport
            .remove_module(name, timeout)
            .await
            .map_err(|e| translate(Operation::Remove, Some(name), e))?;

        info!(module = name, "UDF module removed");
        Ok(())
    }

    /// Lists every registered module. Order is whatever the cluster
    /// returns.
    pub async fn list(&self, session: &Session, policy: &InfoPolicy) -> Result<Vec<UdfFileSummary>> {
        let transport = session.transport()?;
        let timeout = policy.resolve_timeout(session.defaults().info_timeout)?;

        let listings = transport
            .list_modules(timeout)
            .await
            .map_err(|e| translate(Operation::List, None, e))?;

        let summaries = listings
            .into_iter()
            .map(|listing| {
                let listed_name = listing.name.clone();
                UdfFileSummary::try_from(listing).map_err(|_| {
                    Error::cluster_unreachable(format!(
                        "cluster listed an invalid module name: {:?}",
                        listed_name
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Listed {} UDF modules", summaries.len());
        Ok(summaries)
    }

    /// Fetches the stored content of a module, byte for byte.
    pub async fn get(
        &self,
        session: &Session,
        name: &str,
        language: UdfLanguage,
        policy: &InfoPolicy,
    ) -> Result<Vec<u8>> {
        language.ensure_supported().in_module(name)?;
        let transport = session.transport().in_module(name)?;
        let timeout = policy
            .resolve_timeout(session.defaults().info_timeout)
            .in_module(name)?;
        ModuleName::new(name).in_module(name)?;

        let content = transport
            .fetch_module(name, language, timeout)
            .await
            .map_err(|e| translate(Operation::Get, Some(name), e))?;

        debug!(module = name, bytes = content.len(), "Fetched UDF module");
        Ok(content)
    }
}
