//! Effective POM: walk the parent chain, merge, import BOMs, interpolate.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use super::error::{CycleError, CycleKind, PomError};
use super::interpolate::Interpolator;
use super::parse::{RawDependency, RawPom};
use crate::coord::{Coordinate, Exclusion};
use crate::model::{find_managed, Dependency, Pom, Scope};

/// Loads one raw document (memoized by the caller).
pub(crate) type RawLoader<'a> = dyn Fn(&Coordinate) -> Result<Arc<RawPom>, PomError> + 'a;

/// Build the effective POM for `coordinate` (a `@pom` coordinate).
pub(crate) fn effective_pom(coordinate: &Coordinate, load: &RawLoader<'_>) -> Result<Pom, PomError> {
    let mut import_stack = vec![coordinate.clone()];
    build(coordinate, load, &mut import_stack)
}

fn build(coordinate: &Coordinate, load: &RawLoader<'_>, import_stack: &mut Vec<Coordinate>) -> Result<Pom, PomError> {
    let lineage = lineage(coordinate, load)?;
    let own = &lineage[0];
    let mut warnings = Vec::new();
    if own.artifact_id != coordinate.artifact_id() {
        warnings.push(format!(
            "descriptor declares artifactId {} but was fetched as {}",
            own.artifact_id,
            coordinate.artifact_id()
        ));
    }

    let mut properties = BTreeMap::new();
    for raw in lineage.iter().rev() {
        for (k, v) in &raw.properties {
            properties.insert(k.clone(), v.clone());
        }
    }
    add_builtin_properties(&mut properties, coordinate, own);
    let interp = Interpolator::new(&properties);
    let mut missing = BTreeSet::new();

    // Nearest declaration of a managed key wins: walk child first.
    let mut managed: Vec<Dependency> = Vec::new();
    let mut managed_keys = HashSet::new();
    let mut boms: Vec<Coordinate> = Vec::new();
    for raw in &lineage {
        for d in &raw.dependency_management {
            let Some(dep) = resolve_dependency(d, &interp, &[], &mut missing, &mut warnings) else {
                continue;
            };
            if dep.scope == Scope::Import && dep.coordinate.extension() == "pom" {
                boms.push(dep.coordinate.pom_coordinate());
            } else if managed_keys.insert(dep.coordinate.key()) {
                managed.push(dep);
            }
        }
    }
    for bom in boms {
        if import_stack.contains(&bom) {
            let mut chain = import_stack.clone();
            chain.push(bom);
            return Err(CycleError {
                kind: CycleKind::Import,
                chain,
            }
            .into());
        }
        import_stack.push(bom.clone());
        let imported = build(&bom, load, import_stack);
        import_stack.pop();
        let imported = imported?;
        tracing::debug!(coordinate = %coordinate, bom = %bom, entries = imported.dependency_management.len(), "imported BOM");
        for dep in imported.dependency_management {
            if managed_keys.insert(dep.coordinate.key()) {
                managed.push(dep);
            }
        }
    }

    // Own declarations first, then inherited ones not redeclared.
    let mut dependencies = Vec::new();
    let mut dependency_keys = HashSet::new();
    for raw in &lineage {
        for d in &raw.dependencies {
            if let Some(dep) = resolve_dependency(d, &interp, &managed, &mut missing, &mut warnings) {
                if dependency_keys.insert(dep.coordinate.key()) {
                    dependencies.push(dep);
                }
            }
        }
    }

    let mut repositories = Vec::new();
    for raw in &lineage {
        for url in &raw.repositories {
            let url = interp.interpolate(url, &mut missing);
            if !repositories.contains(&url) {
                repositories.push(url);
            }
        }
    }

    for name in &missing {
        tracing::warn!(coordinate = %coordinate, "unresolved property ${{{}}} left as literal", name);
        warnings.push(format!("unresolved property ${{{}}}", name));
    }
    for w in &warnings {
        tracing::debug!(coordinate = %coordinate, "{}", w);
    }

    Ok(Pom {
        coordinate: coordinate.clone(),
        parent: own.parent.as_ref().map(|p| p.coordinate()),
        packaging: own.packaging.clone().unwrap_or_else(|| "jar".to_string()),
        properties,
        dependencies,
        dependency_management: managed,
        repositories,
        warnings,
    })
}

/// `coordinate` followed by its ancestors, nearest first.
fn lineage(coordinate: &Coordinate, load: &RawLoader<'_>) -> Result<Vec<Arc<RawPom>>, PomError> {
    let mut visited = vec![coordinate.clone()];
    let mut poms = vec![load(coordinate)?];
    while let Some(parent) = poms.last().and_then(|p| p.parent.as_ref()).map(|p| p.coordinate()) {
        if visited.contains(&parent) {
            visited.push(parent);
            return Err(CycleError {
                kind: CycleKind::Parent,
                chain: visited,
            }
            .into());
        }
        visited.push(parent.clone());
        poms.push(load(&parent)?);
    }
    Ok(poms)
}

fn add_builtin_properties(props: &mut BTreeMap<String, String>, coordinate: &Coordinate, own: &RawPom) {
    let packaging = own.packaging.clone().unwrap_or_else(|| "jar".to_string());
    let project = [
        ("groupId", coordinate.group_id().to_string()),
        ("artifactId", coordinate.artifact_id().to_string()),
        ("version", coordinate.version().to_string()),
        ("packaging", packaging),
    ];
    for (name, value) in project {
        props.insert(format!("project.{}", name), value.clone());
        props.insert(format!("pom.{}", name), value.clone());
        props.entry(name.to_string()).or_insert(value);
    }
    if let Some(parent) = &own.parent {
        let fields = [
            ("groupId", &parent.group_id),
            ("artifactId", &parent.artifact_id),
            ("version", &parent.version),
        ];
        for (name, value) in fields {
            props.insert(format!("project.parent.{}", name), value.clone());
            props.insert(format!("parent.{}", name), value.clone());
        }
    }
}

/// `<type>` to (extension, implied classifier).
pub fn extension_for_type(dep_type: &str) -> (&str, Option<&'static str>) {
    match dep_type {
        "jar" | "bundle" | "maven-plugin" | "ejb" => ("jar", None),
        "test-jar" => ("jar", Some("tests")),
        "ejb-client" => ("jar", Some("client")),
        "java-source" => ("jar", Some("sources")),
        "javadoc" => ("jar", Some("javadoc")),
        other => (other, None),
    }
}

/// `[1.2.3]` pins a single version; other range syntax is kept verbatim.
fn normalize_version(version: &str, warnings: &mut Vec<String>) -> String {
    let v = version.trim();
    if let Some(inner) = v.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        if !inner.contains(',') && !inner.trim().is_empty() {
            return inner.trim().to_string();
        }
    }
    if v.starts_with('[') || v.starts_with('(') || v.contains(',') {
        warnings.push(format!("version range {} is not supported; used literally", v));
    }
    v.to_string()
}

fn resolve_dependency(
    raw: &RawDependency,
    interp: &Interpolator<'_>,
    managed: &[Dependency],
    missing: &mut BTreeSet<String>,
    warnings: &mut Vec<String>,
) -> Option<Dependency> {
    let group = interp.interpolate_opt(raw.group_id.as_deref(), missing);
    let artifact = interp.interpolate_opt(raw.artifact_id.as_deref(), missing);
    let (Some(group), Some(artifact)) = (group, artifact) else {
        warnings.push("dependency without groupId/artifactId skipped".to_string());
        return None;
    };
    let dep_type = interp
        .interpolate_opt(raw.dep_type.as_deref(), missing)
        .unwrap_or_else(|| "jar".to_string());
    let (extension, implied_classifier) = extension_for_type(&dep_type);
    let classifier = interp
        .interpolate_opt(raw.classifier.as_deref(), missing)
        .or_else(|| implied_classifier.map(str::to_string));

    let lookup = Coordinate::new(&group, &artifact, "")
        .with_extension(extension)
        .with_classifier(classifier.clone().unwrap_or_default());
    let entry = find_managed(managed, &lookup);

    let version = match interp.interpolate_opt(raw.version.as_deref(), missing) {
        Some(v) => v,
        None => match entry {
            Some(m) => m.coordinate.version().to_string(),
            None => {
                warnings.push(format!("{}:{} has no version and no managed version; skipped", group, artifact));
                return None;
            }
        },
    };
    let version = normalize_version(&version, warnings);

    let scope = match interp.interpolate_opt(raw.scope.as_deref(), missing) {
        Some(s) => s.parse::<Scope>().unwrap_or_else(|e| {
            warnings.push(format!("{}:{}: {}; treated as compile", group, artifact, e));
            Scope::Compile
        }),
        None => entry.map(|m| m.scope).unwrap_or_default(),
    };
    let optional = match interp.interpolate_opt(raw.optional.as_deref(), missing) {
        Some(o) => o.eq_ignore_ascii_case("true"),
        None => entry.map(|m| m.optional).unwrap_or(false),
    };
    let classifier = classifier.or_else(|| entry.and_then(|m| m.coordinate.classifier().map(str::to_string)));

    let mut exclusions: BTreeSet<Exclusion> = raw
        .exclusions
        .iter()
        .map(|(g, a)| Exclusion::new(interp.interpolate(g, missing), interp.interpolate(a, missing)))
        .collect();
    if exclusions.is_empty() {
        if let Some(m) = entry {
            exclusions = m.exclusions.clone();
        }
    }

    let coordinate = Coordinate::new(group, artifact, version)
        .with_extension(extension)
        .with_classifier(classifier.unwrap_or_default());
    if let Err(e) = coordinate.validate() {
        tracing::warn!("{}; dependency skipped", e);
        warnings.push(format!("{}; skipped", e));
        return None;
    }

    Some(Dependency {
        coordinate,
        scope,
        optional,
        exclusions,
    })
}
