//! Service registry
//!
//! The registry owns every service of a process, indexed by name. Building
//! it runs the two initialisation phases:
//!
//! 1. Every service is indexed. Duplicate names fail the build.
//! 2. `init` is called on the services that declare it, each with a
//!    [`ClientSet`] owned by its own name.
//! 3. `init_finished` is called on the services that declare it, once every
//!    `init` has succeeded.
//!
//! After that the registry is read-only and cheap to clone.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use nanorpc_common::{ClientExt, Ctx, FnService, Payload, ServiceRegistry};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let svc = FnService::new("svc1", |_ctx: Ctx, req: Payload| async move {
//!     let param = req.downcast::<String>().unwrap_or_default();
//!     Ok(Some(Payload::new(format!("svc1_{}", param))))
//! });
//! let registry = ServiceRegistry::build(vec![Arc::new(svc)]).await;
//!
//! let client = registry.client_set("test").lookup_client("svc1").unwrap();
//! let resp: String = client.call(None, String::from("hello")).await.unwrap();
//! assert_eq!(resp, "svc1_hello");
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::client::{Client, ClientFactory, LocalClientFactory};
use super::request_id::{IdGenerator, RandomIdGenerator};
use super::service::Service;
use crate::protocol::{NanoError, Result};

/// Owner name of the client set returned by [`ServiceRegistry::test_client_set`].
pub const TEST_CLIENT_NAME: &str = "test";

/// The initialised services of a process.
#[derive(Clone)]
pub struct ServiceRegistry {
    services: Arc<HashMap<String, Arc<dyn Service>>>,
    factory: Arc<dyn ClientFactory>,
}

impl ServiceRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Builds a registry with the default client factory.
    ///
    /// # Panics
    ///
    /// Panics if the build fails. A process can't do anything useful with a
    /// half initialised set of services.
    pub async fn build(services: Vec<Arc<dyn Service>>) -> Self {
        Self::builder().services(services).build().await
    }

    pub async fn try_build(services: Vec<Arc<dyn Service>>) -> Result<Self> {
        Self::builder().services(services).try_build().await
    }

    /// Builds a registry from `services` and returns a client set owned by
    /// `"test"`. Panics like [`ServiceRegistry::build`].
    pub async fn test_client_set(services: Vec<Arc<dyn Service>>) -> ClientSet {
        Self::build(services).await.client_set(TEST_CLIENT_NAME)
    }

    pub fn lookup_service(&self, name: &str) -> Result<Arc<dyn Service>> {
        self.services
            .get(name)
            .cloned()
            .ok_or_else(|| NanoError::ServiceNotFound(name.to_owned()))
    }

    /// Returns a client set whose clients report `owner` as the caller.
    pub fn client_set(&self, owner: impl Into<String>) -> ClientSet {
        ClientSet {
            registry: self.clone(),
            owner: owner.into(),
        }
    }

    pub fn client_factory(&self) -> &Arc<dyn ClientFactory> {
        &self.factory
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.service_names().collect();
        names.sort_unstable();
        f.debug_struct("ServiceRegistry")
            .field("services", &names)
            .finish_non_exhaustive()
    }
}

/// Collects services and collaborators for a [`ServiceRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    services: Vec<Arc<dyn Service>>,
    ids: Option<Arc<dyn IdGenerator>>,
    factory: Option<Arc<dyn ClientFactory>>,
}

impl RegistryBuilder {
    pub fn service(mut self, svc: Arc<dyn Service>) -> Self {
        self.services.push(svc);
        self
    }

    pub fn services(mut self, services: impl IntoIterator<Item = Arc<dyn Service>>) -> Self {
        self.services.extend(services);
        self
    }

    /// Request id generator of the default client factory. Ignored when a
    /// factory is set with [`RegistryBuilder::client_factory`].
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn client_factory(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Like [`RegistryBuilder::try_build`] but panics on failure.
    pub async fn build(self) -> ServiceRegistry {
        match self.try_build().await {
            Ok(registry) => registry,
            Err(e) => panic!("{}", e),
        }
    }

    pub async fn try_build(self) -> Result<ServiceRegistry> {
        let factory = match self.factory {
            Some(factory) => factory,
            None => {
                let ids = self
                    .ids
                    .unwrap_or_else(|| Arc::new(RandomIdGenerator::default()));
                Arc::new(LocalClientFactory::new(ids))
            }
        };

        let mut index = HashMap::with_capacity(self.services.len());
        for svc in &self.services {
            let name = svc.name();
            if name.is_empty() {
                return Err(NanoError::Config("service name is empty".into()));
            }
            if index.insert(name.to_owned(), svc.clone()).is_some() {
                return Err(NanoError::DuplicateService(name.to_owned()));
            }
        }

        let registry = ServiceRegistry {
            services: Arc::new(index),
            factory,
        };

        for svc in &self.services {
            if svc.capabilities().init {
                tracing::debug!(service = svc.name(), "initialising service");
                let clients = registry.client_set(svc.name());
                svc.init(&clients).map_err(|source| NanoError::ServiceInit {
                    service: svc.name().to_owned(),
                    source,
                })?;
            }
        }

        for svc in &self.services {
            if svc.capabilities().init_finished {
                tracing::debug!(service = svc.name(), "finishing service initialisation");
                svc.init_finished()
                    .await
                    .map_err(|source| NanoError::ServiceInitFinished {
                        service: svc.name().to_owned(),
                        source,
                    })?;
            }
        }

        Ok(registry)
    }
}

/// Client lookup on behalf of one owner.
#[derive(Clone)]
pub struct ClientSet {
    registry: ServiceRegistry,
    owner: String,
}

impl ClientSet {
    /// Returns a client of the named service. The client may be stored and
    /// used for the lifetime of the registry.
    pub fn lookup_client(&self, name: &str) -> Result<Arc<dyn Client>> {
        let svc = self.registry.lookup_service(name)?;
        Ok(self.registry.factory.new_client(svc, &self.owner))
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl fmt::Debug for ClientSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSet")
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}
