use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::healthcheck::Healthcheck;
use super::keyed::{EnvVariable, ExposedPort, Label, Volume};

/// Where a template's image comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ImageSource {
    /// Pulled by reference, e.g. `nginx:alpine`.
    Registry { reference: String },
    /// Built elsewhere from a context directory and tagged as `tag`.
    Build { context: PathBuf, tag: String },
}

impl ImageSource {
    /// The reference containers are created from.
    pub fn reference(&self) -> &str {
        match self {
            ImageSource::Registry { reference } => reference,
            ImageSource::Build { tag, .. } => tag,
        }
    }
}

/// Reusable container blueprint. Services snapshot it once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    pub name: String,
    pub image: ImageSource,
    #[serde(default)]
    pub default_env: Vec<EnvVariable>,
    #[serde(default)]
    pub default_ports: Vec<ExposedPort>,
    #[serde(default)]
    pub default_volumes: Vec<Volume>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub start_cmd: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub healthcheck: Option<Healthcheck>,
}

impl Template {
    pub fn from_image(id: i64, name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            image: ImageSource::Registry {
                reference: reference.into(),
            },
            default_env: Vec::new(),
            default_ports: Vec::new(),
            default_volumes: Vec::new(),
            labels: Vec::new(),
            start_cmd: None,
            args: Vec::new(),
            healthcheck: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_from_yaml_uses_canonical_decoders() {
        let yaml = r#"
id: 3
name: web
image:
  kind: registry
  reference: nginx:alpine
default_env:
  - PORT=80
default_ports:
  - 80
default_volumes:
  - /usr/share/nginx/html
"#;
        let template: Template = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(template.image.reference(), "nginx:alpine");
        assert_eq!(template.default_env, vec![EnvVariable::new("PORT", "80")]);
        assert_eq!(template.default_ports, vec![ExposedPort::new(80, None)]);
        assert_eq!(template.default_volumes[0].host_path, None);
        assert!(template.healthcheck.is_none());
    }

    #[test]
    fn build_source_decodes_from_a_plain_map() {
        let yaml = "kind: build\ncontext: /srv/build/app\ntag: app:latest\n";
        let source: ImageSource = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            source,
            ImageSource::Build {
                context: "/srv/build/app".into(),
                tag: "app:latest".into(),
            }
        );
        let back = serde_yaml::to_string(&source).unwrap();
        assert!(back.contains("kind: build"));
    }

    #[test]
    fn build_source_references_its_tag() {
        let source = ImageSource::Build {
            context: "/srv/build/app".into(),
            tag: "svs-build/app:latest".into(),
        };
        assert_eq!(source.reference(), "svs-build/app:latest");
    }
}
