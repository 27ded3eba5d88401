//! POM XML to an uninterpolated document.

use roxmltree::{Document, Node};
use std::borrow::Cow;

use super::error::ParseError;
use crate::coord::Coordinate;

/// `<parent>` reference, taken literally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawParent {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl RawParent {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(&self.group_id, &self.artifact_id, &self.version).pom_coordinate()
    }
}

/// A `<dependency>` element with every field still raw text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawDependency {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub classifier: Option<String>,
    pub dep_type: Option<String>,
    pub optional: Option<String>,
    pub exclusions: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawPom {
    pub group_id: Option<String>,
    pub artifact_id: String,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<RawParent>,
    /// Declaration order.
    pub properties: Vec<(String, String)>,
    pub dependencies: Vec<RawDependency>,
    pub dependency_management: Vec<RawDependency>,
    pub repositories: Vec<String>,
}

impl RawPom {
    /// Parse descriptor bytes fetched for `source`. Unknown elements are ignored.
    pub fn parse(bytes: &[u8], source: &Coordinate) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ParseError::new(source, format!("not UTF-8: {}", e)))?;
        let text = text.trim_start_matches('\u{feff}');
        let normalized = normalize_xml_entities(text);
        let document = Document::parse(normalized.as_ref())
            .map_err(|e| ParseError::new(source, e.to_string()))?;
        let project = document.root_element();
        if project.tag_name().name() != "project" {
            return Err(ParseError::new(
                source,
                format!("root element is <{}>, expected <project>", project.tag_name().name()),
            ));
        }

        let parent = child(&project, "parent").map(|p| parse_parent(&p, source)).transpose()?;
        let artifact_id = node_text(&project, "artifactId")
            .ok_or_else(|| ParseError::new(source, "missing <artifactId>"))?;
        let group_id = node_text(&project, "groupId");
        let version = node_text(&project, "version");
        if parent.is_none() {
            if group_id.is_none() {
                return Err(ParseError::new(source, "missing <groupId> and no <parent>"));
            }
            if version.is_none() {
                return Err(ParseError::new(source, "missing <version> and no <parent>"));
            }
        }

        Ok(Self {
            group_id,
            artifact_id,
            version,
            packaging: node_text(&project, "packaging"),
            parent,
            properties: parse_properties(&project),
            dependencies: child(&project, "dependencies")
                .map(|d| parse_dependency_list(&d))
                .unwrap_or_default(),
            dependency_management: child(&project, "dependencyManagement")
                .and_then(|dm| child(&dm, "dependencies"))
                .map(|d| parse_dependency_list(&d))
                .unwrap_or_default(),
            repositories: parse_repositories(&project),
        })
    }
}

fn parse_parent(node: &Node<'_, '_>, source: &Coordinate) -> Result<RawParent, ParseError> {
    let field = |tag: &str| {
        node_text(node, tag).ok_or_else(|| ParseError::new(source, format!("<parent> is missing <{}>", tag)))
    };
    let parent = RawParent {
        group_id: field("groupId")?,
        artifact_id: field("artifactId")?,
        version: field("version")?,
    };
    parent
        .coordinate()
        .validate()
        .map_err(|e| ParseError::new(source, format!("<parent>: {}", e)))?;
    Ok(parent)
}

fn parse_properties(project: &Node<'_, '_>) -> Vec<(String, String)> {
    child(project, "properties")
        .map(|props| {
            props
                .children()
                .filter(|c| c.is_element())
                .map(|prop| {
                    let key = prop.tag_name().name().to_string();
                    let value = prop.text().map(|t| t.trim().to_string()).unwrap_or_default();
                    (key, value)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_dependency_list(deps: &Node<'_, '_>) -> Vec<RawDependency> {
    deps.children()
        .filter(|c| c.is_element() && c.tag_name().name() == "dependency")
        .map(|dep| RawDependency {
            group_id: node_text(&dep, "groupId"),
            artifact_id: node_text(&dep, "artifactId"),
            version: node_text(&dep, "version"),
            scope: node_text(&dep, "scope"),
            classifier: node_text(&dep, "classifier"),
            dep_type: node_text(&dep, "type"),
            optional: node_text(&dep, "optional"),
            exclusions: child(&dep, "exclusions")
                .map(|ex| {
                    ex.children()
                        .filter(|c| c.is_element() && c.tag_name().name() == "exclusion")
                        .filter_map(|e| Some((node_text(&e, "groupId")?, node_text(&e, "artifactId")?)))
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect()
}

fn parse_repositories(project: &Node<'_, '_>) -> Vec<String> {
    child(project, "repositories")
        .map(|repos| {
            repos
                .children()
                .filter(|c| c.is_element() && c.tag_name().name() == "repository")
                .filter_map(|r| node_text(&r, "url"))
                .collect()
        })
        .unwrap_or_default()
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == tag)
}

fn node_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|c| c.text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Replace HTML-style named entities (`&nbsp;`, `&copy;`) that real-world
/// POMs use without a DTD; XML's own five and numeric references are kept.
fn normalize_xml_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }
    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        output.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        match after.find(';').filter(|&end| end <= 32) {
            Some(end) => {
                let name = &after[..end];
                let known = matches!(name, "lt" | "gt" | "amp" | "quot" | "apos") || name.starts_with('#');
                if known {
                    output.push('&');
                    output.push_str(name);
                    output.push(';');
                } else {
                    output.push(' ');
                }
                rest = &after[end + 1..];
            }
            None => {
                output.push('&');
                rest = after;
            }
        }
    }
    output.push_str(rest);
    Cow::Owned(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src() -> Coordinate {
        Coordinate::new("com.example", "lib", "1.0").pom_coordinate()
    }

    const FULL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>com.example</groupId>
    <artifactId>parent</artifactId>
    <version>3</version>
  </parent>
  <artifactId>lib</artifactId>
  <version>1.0</version>
  <packaging>bundle</packaging>
  <description>Caf&eacute; &amp; more</description>
  <properties>
    <util.version>2.0</util.version>
    <empty.prop/>
  </properties>
  <repositories>
    <repository><id>extra</id><url>https://repo.example.org/maven/</url></repository>
  </repositories>
  <dependencyManagement>
    <dependencies>
      <dependency><groupId>com.example</groupId><artifactId>managed</artifactId><version>9</version></dependency>
    </dependencies>
  </dependencyManagement>
  <dependencies>
    <dependency>
      <groupId>com.example</groupId>
      <artifactId>util</artifactId>
      <version>${util.version}</version>
      <optional>true</optional>
      <exclusions>
        <exclusion><groupId>org.noise</groupId><artifactId>*</artifactId></exclusion>
      </exclusions>
    </dependency>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>4.13</version>
      <scope>test</scope>
      <type>test-jar</type>
    </dependency>
  </dependencies>
  <build><plugins><plugin><artifactId>ignored</artifactId></plugin></plugins></build>
</project>"#;

    #[test]
    fn parses_known_elements() {
        let pom = RawPom::parse(FULL.as_bytes(), &src()).unwrap();
        assert_eq!(pom.group_id, None);
        assert_eq!(pom.artifact_id, "lib");
        assert_eq!(pom.version.as_deref(), Some("1.0"));
        assert_eq!(pom.packaging.as_deref(), Some("bundle"));
        assert_eq!(
            pom.parent,
            Some(RawParent {
                group_id: "com.example".into(),
                artifact_id: "parent".into(),
                version: "3".into(),
            })
        );
        assert_eq!(
            pom.properties,
            vec![
                ("util.version".to_string(), "2.0".to_string()),
                ("empty.prop".to_string(), String::new()),
            ]
        );
        assert_eq!(pom.repositories, vec!["https://repo.example.org/maven/"]);
        assert_eq!(pom.dependency_management.len(), 1);
        assert_eq!(pom.dependencies.len(), 2);
        let util = &pom.dependencies[0];
        assert_eq!(util.version.as_deref(), Some("${util.version}"));
        assert_eq!(util.optional.as_deref(), Some("true"));
        assert_eq!(util.exclusions, vec![("org.noise".to_string(), "*".to_string())]);
        assert_eq!(pom.dependencies[1].dep_type.as_deref(), Some("test-jar"));
    }

    #[test]
    fn missing_artifact_id_is_a_parse_error() {
        let xml = "<project><groupId>g</groupId><version>1</version></project>";
        let err = RawPom::parse(xml.as_bytes(), &src()).unwrap_err();
        assert!(err.message.contains("artifactId"));
    }

    #[test]
    fn group_required_without_parent() {
        let xml = "<project><artifactId>a</artifactId><version>1</version></project>";
        assert!(RawPom::parse(xml.as_bytes(), &src()).is_err());
    }

    #[test]
    fn parent_with_traversal_segments_is_a_parse_error() {
        let xml = "<project><parent><groupId>g</groupId><artifactId>../../up</artifactId><version>1</version></parent><artifactId>a</artifactId></project>";
        let err = RawPom::parse(xml.as_bytes(), &src()).unwrap_err();
        assert!(err.message.contains("<parent>"));
        assert!(err.message.contains("artifactId"));
    }

    #[test]
    fn malformed_xml() {
        let err = RawPom::parse(b"<project><artifactId>a</project>", &src()).unwrap_err();
        assert_eq!(err.coordinate, src());
        assert!(RawPom::parse(b"<notaproject/>", &src()).is_err());
        assert!(RawPom::parse(&[0xff, 0xfe, 0x00], &src()).is_err());
    }

    #[test]
    fn entity_normalisation() {
        assert_eq!(normalize_xml_entities("a &nbsp; b"), "a   b");
        assert_eq!(normalize_xml_entities("&lt;x&gt; &#169;"), "&lt;x&gt; &#169;");
        assert_eq!(normalize_xml_entities("AT&T"), "AT&T");
    }
}
