//! Resource classification
//!
//! Every document is tried against a fixed, ordered table of shapes:
//! HelmRelease, GitRepository, Secret, ConfigMap. A shape matches when the
//! document's `kind` equals the shape's discriminator **and** the document
//! decodes into the typed shape. The first match wins; documents matching
//! nothing are skipped, since rendered charts routinely contain kinds the
//! planner does not track.

use indexmap::IndexMap;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use serde_yaml::Value;

use fluxplan_core::{ConfigKind, NamespacedKey};

use crate::resources::{
    ConfigObject, GIT_REPOSITORY_KIND, GitRepository, HELM_RELEASE_KIND, HelmRelease, object_key,
};
use crate::split::Document;

/// A classified resource
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Release(NamespacedKey, Box<HelmRelease>),
    Source(NamespacedKey, Box<GitRepository>),
    Config(ConfigObject),
}

impl Resource {
    pub fn key(&self) -> &NamespacedKey {
        match self {
            Self::Release(key, _) | Self::Source(key, _) => key,
            Self::Config(object) => &object.key,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Release(..) => HELM_RELEASE_KIND,
            Self::Source(..) => GIT_REPOSITORY_KIND,
            Self::Config(object) => object.kind.kind_name(),
        }
    }
}

/// A resource together with the sequence number of its document
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub seq: usize,
    pub resource: Resource,
}

/// Decodes the document text into a typed shape
///
/// Decoding starts from the text, not the parsed `Value`: integer mapping
/// keys under `spec.values` must arrive as strings.
type Decoder = fn(&str, &str) -> Option<Resource>;

/// One entry of the decoder table
struct Shape {
    kind: &'static str,
    decode: Decoder,
}

/// Decoders in priority order
const SHAPES: [Shape; 4] = [
    Shape {
        kind: HELM_RELEASE_KIND,
        decode: decode_release,
    },
    Shape {
        kind: GIT_REPOSITORY_KIND,
        decode: decode_source,
    },
    Shape {
        kind: "Secret",
        decode: decode_secret,
    },
    Shape {
        kind: "ConfigMap",
        decode: decode_config_map,
    },
];

fn decode_release(text: &str, default_namespace: &str) -> Option<Resource> {
    let release: HelmRelease = serde_yaml::from_str(text).ok()?;
    if release.kind != HELM_RELEASE_KIND {
        return None;
    }
    let key = object_key(&release.metadata, default_namespace)?;
    Some(Resource::Release(key, Box::new(release)))
}

fn decode_source(text: &str, default_namespace: &str) -> Option<Resource> {
    let repo: GitRepository = serde_yaml::from_str(text).ok()?;
    if repo.kind != GIT_REPOSITORY_KIND || repo.spec.url.is_empty() {
        return None;
    }
    let key = object_key(&repo.metadata, default_namespace)?;
    Some(Resource::Source(key, Box::new(repo)))
}

fn decode_secret(text: &str, default_namespace: &str) -> Option<Resource> {
    let secret: Secret = serde_yaml::from_str(text).ok()?;
    let key = object_key(&secret.metadata, default_namespace)?;
    Some(Resource::Config(ConfigObject::from_secret(key, secret)))
}

fn decode_config_map(text: &str, default_namespace: &str) -> Option<Resource> {
    let config_map: ConfigMap = serde_yaml::from_str(text).ok()?;
    let key = object_key(&config_map.metadata, default_namespace)?;
    Some(Resource::Config(ConfigObject::from_config_map(key, config_map)))
}

/// The four keyed collections produced by classification
///
/// Every map preserves first-seen order. A duplicate key replaces the stored
/// object but keeps the position of the first occurrence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    pub releases: IndexMap<NamespacedKey, HelmRelease>,
    pub sources: IndexMap<NamespacedKey, GitRepository>,
    pub secrets: IndexMap<NamespacedKey, ConfigObject>,
    pub config_maps: IndexMap<NamespacedKey, ConfigObject>,
    /// Documents that matched no shape
    pub skipped: usize,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a classified resource, last write wins
    pub fn insert(&mut self, resource: Resource) {
        let kind = resource.kind_name();
        let key = resource.key().clone();
        let previous = match resource {
            Resource::Release(key, release) => self.releases.insert(key, *release).map(|_| ()),
            Resource::Source(key, repo) => self.sources.insert(key, *repo).map(|_| ()),
            Resource::Config(object) => {
                let map = match object.kind {
                    ConfigKind::SecretLike => &mut self.secrets,
                    ConfigKind::ConfigLike => &mut self.config_maps,
                };
                let key = object.key.clone();
                map.insert(key, object).map(|_| ())
            }
        };
        if previous.is_some() {
            tracing::debug!("Duplicate {} {} replaced an earlier definition", kind, key);
        }
    }

    /// Look up a Secret or ConfigMap by kind and key
    pub fn config_object(&self, kind: ConfigKind, key: &NamespacedKey) -> Option<&ConfigObject> {
        match kind {
            ConfigKind::SecretLike => self.secrets.get(key),
            ConfigKind::ConfigLike => self.config_maps.get(key),
        }
    }

    /// Number of classified objects
    pub fn len(&self) -> usize {
        self.releases.len() + self.sources.len() + self.secrets.len() + self.config_maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classifies documents into an [`Inventory`]
#[derive(Debug, Clone)]
pub struct Classifier {
    default_namespace: String,
}

impl Classifier {
    /// Create a classifier; objects without a namespace land in `default_namespace`
    pub fn new(default_namespace: impl Into<String>) -> Self {
        Self {
            default_namespace: default_namespace.into(),
        }
    }

    /// Classify a single document
    ///
    /// Returns `None` when the document is not YAML, has no `kind`, or matches
    /// none of the tracked shapes.
    pub fn classify_document(&self, doc: &Document) -> Option<Classified> {
        let value: Value = match serde_yaml::from_str(&doc.text) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Skipping document {}: not valid YAML: {}", doc.seq, e);
                return None;
            }
        };

        let kind = value.get("kind").and_then(Value::as_str).unwrap_or_default();

        let resource = SHAPES
            .iter()
            .filter(|shape| shape.kind == kind)
            .find_map(|shape| (shape.decode)(&doc.text, &self.default_namespace));

        match resource {
            Some(resource) => Some(Classified {
                seq: doc.seq,
                resource,
            }),
            None => {
                tracing::debug!("Skipping document {} of kind '{}'", doc.seq, kind);
                None
            }
        }
    }

    /// Classify documents sequentially
    pub fn classify(&self, docs: &[Document]) -> Inventory {
        let results: Vec<Option<Classified>> =
            docs.iter().map(|doc| self.classify_document(doc)).collect();
        Self::collect(docs, results)
    }

    /// Classify documents on up to `workers` threads
    ///
    /// Decoding is independent per document. Results are merged by the
    /// calling thread in document order, so the inventory is identical to
    /// the one [`classify`](Self::classify) produces.
    pub fn classify_parallel(&self, docs: &[Document], workers: usize) -> Inventory {
        let workers = workers.max(1);
        if workers == 1 || docs.len() < 2 {
            return self.classify(docs);
        }

        let chunk_size = docs.len().div_ceil(workers);
        let results: Vec<Option<Classified>> = std::thread::scope(|scope| {
            let handles: Vec<_> = docs
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|doc| self.classify_document(doc))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(results) => results,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        Self::collect(docs, results)
    }

    fn collect(docs: &[Document], results: Vec<Option<Classified>>) -> Inventory {
        let mut classified: Vec<Classified> = results.into_iter().flatten().collect();
        classified.sort_by_key(|c| c.seq);

        let mut inventory = Inventory::new();
        inventory.skipped = docs.len() - classified.len();
        for c in classified {
            inventory.insert(c.resource);
        }

        tracing::debug!(
            "Classified {} documents: {} releases, {} sources, {} secrets, {} configmaps, {} skipped",
            docs.len(),
            inventory.releases.len(),
            inventory.sources.len(),
            inventory.secrets.len(),
            inventory.config_maps.len(),
            inventory.skipped
        );

        inventory
    }
}
