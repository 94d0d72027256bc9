//! Inheritable route policy.
//!
//! Every node of the route tree may declare a partial [`PolicyOverrides`].
//! During a walk the overrides of each visited node are applied, in
//! root-to-leaf order, onto a [`Policy`] seeded from the engine settings.
//! A declared field replaces the accumulated value; an undeclared field
//! keeps whatever an ancestor (or the seed) put there.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::schema::EngineConfig;

/// Output renderer selected for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Renderer {
    View,
    Json,
    File,
    Text,
}

/// A template part is either switched on/off or pointed at another file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplatePart {
    Enabled(bool),
    Path(String),
}

/// Template layout override. Replaced as a whole when a node declares one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateOverride {
    pub root: Option<String>,
    pub head: Option<TemplatePart>,
    pub nav: Option<TemplatePart>,
    pub footer: Option<TemplatePart>,
}

/// Cache settings as declared on a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheOverride {
    pub status: Option<bool>,
    pub expire_secs: Option<u64>,
}

/// Authentication tag attached to a node.
///
/// Written as `"customer"` for a fixed tag or `"?tenant"` for the value
/// captured by the wildcard named `tenant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AuthTag {
    Fixed(String),
    Captured(String),
}

impl AuthTag {
    /// Resolve the tag against the captures made so far.
    pub fn resolve(&self, captures: &IndexMap<String, String>) -> Option<String> {
        match self {
            AuthTag::Fixed(tag) => Some(tag.clone()),
            AuthTag::Captured(name) => captures.get(name).cloned(),
        }
    }

    /// Name of the capture this tag refers to, if any.
    pub fn captured_name(&self) -> Option<&str> {
        match self {
            AuthTag::Fixed(_) => None,
            AuthTag::Captured(name) => Some(name),
        }
    }
}

impl TryFrom<String> for AuthTag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.strip_prefix('?') {
            Some("") => Err("auth tag `?` names no capture".to_string()),
            Some(name) => Ok(AuthTag::Captured(name.to_lowercase())),
            None if value.is_empty() => Err("auth tag must not be empty".to_string()),
            None => Ok(AuthTag::Fixed(value)),
        }
    }
}

impl From<AuthTag> for String {
    fn from(tag: AuthTag) -> Self {
        tag.to_string()
    }
}

impl fmt::Display for AuthTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthTag::Fixed(tag) => write!(f, "{}", tag),
            AuthTag::Captured(name) => write!(f, "?{}", name),
        }
    }
}

/// One `/`-separated part of a [`UrlTemplate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPart {
    Literal(String),
    Captured(String),
}

/// URL whose `?name` path parts are filled from captured segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UrlTemplate {
    parts: Vec<UrlPart>,
}

impl UrlTemplate {
    /// Names of the captures this template refers to.
    pub fn captured_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            UrlPart::Captured(name) => Some(name.as_str()),
            UrlPart::Literal(_) => None,
        })
    }

    /// Render the URL. A part whose capture is missing is left as written.
    pub fn render(&self, captures: &IndexMap<String, String>) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                UrlPart::Literal(text) => text.clone(),
                UrlPart::Captured(name) => captures
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| format!("?{}", name)),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl TryFrom<String> for UrlTemplate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err("url must not be empty".to_string());
        }
        let mut parts = Vec::new();
        for part in value.split('/') {
            match part.strip_prefix('?') {
                Some("") => return Err(format!("url `{}` has a `?` part naming no capture", value)),
                Some(name) => parts.push(UrlPart::Captured(name.to_lowercase())),
                None => parts.push(UrlPart::Literal(part.to_string())),
            }
        }
        Ok(Self { parts })
    }
}

impl From<UrlTemplate> for String {
    fn from(url: UrlTemplate) -> Self {
        url.to_string()
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match part {
                UrlPart::Literal(text) => f.write_str(text)?,
                UrlPart::Captured(name) => write!(f, "?{}", name)?,
            }
        }
        Ok(())
    }
}

/// Policy fields a node declares. Absent fields inherit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyOverrides {
    pub renderer: Option<Renderer>,
    pub offline: Option<bool>,
    pub downloadable: Option<bool>,
    pub cache: Option<CacheOverride>,
    pub auth_tag: Option<AuthTag>,
    pub auth_fail_url: Option<UrlTemplate>,
    pub site_name: Option<String>,
    pub error404_url: Option<String>,
    pub template: Option<TemplateOverride>,
}

impl PolicyOverrides {
    /// True when the node declares nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Effective cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CachePolicy {
    pub status: bool,
    pub expire_secs: u64,
}

/// Accumulated policy for one walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Policy {
    pub renderer: Option<Renderer>,
    pub offline: bool,
    pub downloadable: bool,
    pub cache: CachePolicy,
    pub auth_tag: Option<AuthTag>,
    pub auth_fail_url: Option<UrlTemplate>,
    pub site_name: String,
    pub error404_url: String,
    pub template: Option<TemplateOverride>,
}

impl Policy {
    /// Policy in effect before the root node is visited.
    pub fn seeded(config: &EngineConfig) -> Self {
        Self {
            renderer: config.rendering.default_renderer,
            offline: false,
            downloadable: false,
            cache: CachePolicy {
                status: config.cache.status,
                expire_secs: config.cache.expire_secs,
            },
            auth_tag: None,
            auth_fail_url: None,
            site_name: config.title.site_name.clone(),
            error404_url: config.error404_url.clone(),
            template: None,
        }
    }

    /// Apply a node's declarations. Last writer along the path wins.
    pub fn apply(&mut self, overrides: &PolicyOverrides) {
        if let Some(renderer) = overrides.renderer {
            self.renderer = Some(renderer);
        }
        if let Some(offline) = overrides.offline {
            self.offline = offline;
        }
        if let Some(downloadable) = overrides.downloadable {
            self.downloadable = downloadable;
        }
        if let Some(cache) = &overrides.cache {
            if let Some(status) = cache.status {
                self.cache.status = status;
            }
            if let Some(expire_secs) = cache.expire_secs {
                self.cache.expire_secs = expire_secs;
            }
        }
        if let Some(tag) = &overrides.auth_tag {
            self.auth_tag = Some(tag.clone());
        }
        if let Some(url) = &overrides.auth_fail_url {
            self.auth_fail_url = Some(url.clone());
        }
        if let Some(site_name) = &overrides.site_name {
            self.site_name = site_name.clone();
        }
        if let Some(url) = &overrides.error404_url {
            self.error404_url = url.clone();
        }
        if let Some(template) = &overrides.template {
            self.template = Some(template.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(status: Option<bool>, expire_secs: Option<u64>) -> PolicyOverrides {
        PolicyOverrides {
            cache: Some(CacheOverride { status, expire_secs }),
            ..Default::default()
        }
    }

    #[test]
    fn test_inheritance_chain() {
        let config = EngineConfig::default();
        let mut policy = Policy::seeded(&config);

        // A declares status=false, B declares nothing, C re-declares status=true
        policy.apply(&cache(Some(false), None));
        policy.apply(&PolicyOverrides::default());
        assert!(!policy.cache.status);
        assert_eq!(policy.cache.expire_secs, config.cache.expire_secs);

        policy.apply(&cache(Some(true), Some(60)));
        assert!(policy.cache.status);
        assert_eq!(policy.cache.expire_secs, 60);
    }

    #[test]
    fn test_unset_fields_keep_ancestor_value() {
        let mut policy = Policy::seeded(&EngineConfig::default());
        policy.apply(&PolicyOverrides {
            renderer: Some(Renderer::Json),
            site_name: Some("Shop".into()),
            ..Default::default()
        });
        policy.apply(&PolicyOverrides {
            offline: Some(true),
            ..Default::default()
        });

        assert_eq!(policy.renderer, Some(Renderer::Json));
        assert_eq!(policy.site_name, "Shop");
        assert!(policy.offline);
    }

    #[test]
    fn test_auth_tag_forms() {
        assert_eq!(
            AuthTag::try_from("customer".to_string()).unwrap(),
            AuthTag::Fixed("customer".into())
        );
        let captured = AuthTag::try_from("?Tenant".to_string()).unwrap();
        assert_eq!(captured, AuthTag::Captured("tenant".into()));
        assert_eq!(captured.to_string(), "?tenant");
        assert!(AuthTag::try_from("?".to_string()).is_err());
        assert!(AuthTag::try_from(String::new()).is_err());
    }

    #[test]
    fn test_auth_tag_resolution() {
        let mut captures = IndexMap::new();
        captures.insert("tenant".to_string(), "acme".to_string());

        assert_eq!(
            AuthTag::Captured("tenant".into()).resolve(&captures),
            Some("acme".to_string())
        );
        assert_eq!(AuthTag::Captured("org".into()).resolve(&captures), None);
        assert_eq!(
            AuthTag::Fixed("tenant".into()).resolve(&captures),
            Some("tenant".to_string())
        );
    }

    #[test]
    fn test_url_template_render() {
        let url = UrlTemplate::try_from("/?tenant/login".to_string()).unwrap();
        assert_eq!(url.captured_names().collect::<Vec<_>>(), vec!["tenant"]);
        assert_eq!(url.to_string(), "/?tenant/login");

        let mut captures = IndexMap::new();
        captures.insert("tenant".to_string(), "acme".to_string());
        assert_eq!(url.render(&captures), "/acme/login");
        assert_eq!(url.render(&IndexMap::new()), "/?tenant/login");
    }

    #[test]
    fn test_overrides_reject_unknown_fields() {
        let value: toml::Value = toml::from_str("renderer = \"json\"\ncolour = \"red\"").unwrap();
        assert!(value.try_into::<PolicyOverrides>().is_err());

        let value: toml::Value =
            toml::from_str("renderer = \"json\"\ncache = { expire_secs = 5 }").unwrap();
        let overrides: PolicyOverrides = value.try_into().unwrap();
        assert_eq!(overrides.renderer, Some(Renderer::Json));
        assert_eq!(overrides.cache.unwrap().expire_secs, Some(5));
    }
}
