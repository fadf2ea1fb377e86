use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::model::config::LayoutConfig;
use crate::plugin::artifact::ArtifactLocation;
use crate::plugin::error::ResolveError;
use crate::plugin::fs::{DiskLayout, EntryKind, LayoutReader};
use crate::plugin::identifier::{PluginIdentifier, PluginType};
use crate::plugin::layout::{
    self, PluginLocationConvention, artifact_file_name, bundle_library_directory,
    common_dependency_files, connectors_dir, is_artifact, is_primary_candidate, plugins_dir,
    shared_dependency_directories,
};
use crate::plugin::mapping::{MappingError, PluginMapping};

/// Turns plugin identifiers into the archives a loader needs.
///
/// Every call recomputes from the layout; the resolver keeps no cache, so a
/// shared instance can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct PluginDependencyResolver<R = DiskLayout> {
    root: PathBuf,
    convention: PluginLocationConvention,
    reader: R,
}

impl PluginDependencyResolver<DiskLayout> {
    /// Read the mapping file of an install and resolve against the disk.
    pub fn open(layout: &LayoutConfig) -> Result<Self, MappingError> {
        let mapping = PluginMapping::load(&layout.mapping_path())?;
        Ok(Self::new(layout, mapping, DiskLayout))
    }
}

impl<R: LayoutReader> PluginDependencyResolver<R> {
    pub fn new(layout: &LayoutConfig, mapping: PluginMapping, reader: R) -> Self {
        Self {
            root: layout.root().to_path_buf(),
            convention: PluginLocationConvention::new(mapping),
            reader,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn convention(&self) -> &PluginLocationConvention {
        &self.convention
    }

    /// One primary artifact per identifier, in request order.
    ///
    /// All identifiers are mapped before the filesystem is consulted, so an
    /// unmapped or ambiguous request fails without touching any path.
    pub fn primary_artifacts(
        &self,
        identifiers: &[PluginIdentifier],
    ) -> Result<Vec<ArtifactLocation>, ResolveError> {
        let install_names = self.install_names(identifiers)?;

        install_names
            .into_iter()
            .map(|(identifier, name)| self.locate_primary(identifier, name))
            .collect()
    }

    /// Primary, private and shared artifacts of `identifiers`, deduplicated
    /// and sorted by path.
    pub fn plugin_jar_and_dependency_paths(
        &self,
        identifiers: &[PluginIdentifier],
    ) -> Result<Vec<ArtifactLocation>, ResolveError> {
        let mut artifacts: BTreeSet<ArtifactLocation> =
            self.primary_artifacts(identifiers)?.into_iter().collect();

        for identifier in identifiers {
            artifacts.extend(self.private_dependencies(identifier)?);
        }
        artifacts.extend(self.shared_dependencies()?);

        tracing::debug!(
            "resolved {} artifacts for {} plugins under {}",
            artifacts.len(),
            identifiers.len(),
            self.root.display()
        );

        Ok(artifacts.into_iter().collect())
    }

    /// Archives under `plugins/<name>/` and `plugins/<name>/lib/`.
    pub fn private_dependencies(
        &self,
        identifier: &PluginIdentifier,
    ) -> Result<Vec<ArtifactLocation>, ResolveError> {
        let mut artifacts = BTreeSet::new();
        for dir in self
            .convention
            .private_dependency_directories(identifier, &self.root)?
        {
            artifacts.extend(self.artifacts_in(&dir)?);
        }

        Ok(artifacts.into_iter().collect())
    }

    /// Archives every plugin gets: `plugins/other/*.jar`, `plugins/*.jar` and
    /// the `lib/` of any directory under `plugins/` that no mapping names.
    pub fn shared_dependencies(&self) -> Result<Vec<ArtifactLocation>, ResolveError> {
        let mut shared = BTreeSet::new();

        for dir in shared_dependency_directories(&self.root) {
            shared.extend(self.artifacts_in(&dir)?);
        }
        shared.extend(self.artifacts_in(&common_dependency_files(&self.root))?);

        let mapped = self.convention.mapping().install_names();
        for bundle in self.subdirectories(&plugins_dir(&self.root))? {
            let is_plugin_dir = bundle
                .to_str()
                .is_some_and(|name| mapped.contains(name));
            if is_plugin_dir {
                continue;
            }

            shared.extend(self.artifacts_in(&bundle_library_directory(&self.root, &bundle))?);
        }

        Ok(shared.into_iter().collect())
    }

    /// Shared archives that no active plugin also carries privately.
    ///
    /// Matching is by file name: a shared `mysql-driver.jar` counts as used
    /// when any active plugin ships its own `mysql-driver.jar`, wherever it
    /// sits in that plugin's directories.
    pub fn unused_shared_dependencies(
        &self,
        active: &[PluginIdentifier],
    ) -> Result<Vec<ArtifactLocation>, ResolveError> {
        let shared = self.shared_dependencies()?;
        self.primary_artifacts(active)?;

        let mut vendored = HashSet::new();
        for identifier in active {
            for artifact in self.private_dependencies(identifier)? {
                if let Some(name) = artifact.file_name() {
                    vendored.insert(name.to_string());
                }
            }
        }

        Ok(shared
            .into_iter()
            .filter(|artifact| {
                artifact
                    .file_name()
                    .is_none_or(|name| !vendored.contains(name))
            })
            .collect())
    }

    /// `plugins/<name>` directories that every mapped plugin should have but
    /// that are absent from the install.
    pub fn missing_dependency_directories(&self) -> Result<Vec<PathBuf>, ResolveError> {
        let mut missing = Vec::new();
        for name in self.convention.mapping().install_names() {
            let dir = plugins_dir(&self.root).join(name);
            if self.entry_kind(&dir)? != Some(EntryKind::Dir) {
                missing.push(dir);
            }
        }

        Ok(missing)
    }

    fn install_names<'a>(
        &'a self,
        identifiers: &'a [PluginIdentifier],
    ) -> Result<Vec<(&'a PluginIdentifier, &'a str)>, ResolveError> {
        let mut seen = HashSet::new();
        let mut claimed: HashMap<(PluginType, &str), &PluginIdentifier> = HashMap::new();
        let mut names = Vec::with_capacity(identifiers.len());

        for identifier in identifiers {
            let name = self.convention.install_name(identifier)?;

            if !seen.insert(identifier) {
                return Err(ResolveError::AmbiguousPlugin {
                    identifier: identifier.clone(),
                    reason: "requested more than once".to_string(),
                });
            }

            if let Some(other) = claimed.insert((identifier.plugin_type(), name), identifier) {
                return Err(ResolveError::AmbiguousPlugin {
                    identifier: identifier.clone(),
                    reason: format!("install name {name} is also claimed by {other}"),
                });
            }

            names.push((identifier, name));
        }

        Ok(names)
    }

    /// The single archive in `connectors/` whose name starts with `name`.
    fn locate_primary(
        &self,
        identifier: &PluginIdentifier,
        name: &str,
    ) -> Result<ArtifactLocation, ResolveError> {
        let connectors = connectors_dir(&self.root);
        let mut candidates: Vec<_> = self
            .artifacts_in(&connectors)?
            .into_iter()
            .filter(|artifact| {
                artifact
                    .file_name()
                    .is_some_and(|file_name| is_primary_candidate(file_name, name))
            })
            .collect();
        candidates.sort();

        match candidates.len() {
            0 => Err(ResolveError::MissingPluginArtifact {
                identifier: identifier.clone(),
                path: connectors.join(artifact_file_name(name)),
            }),
            1 => Ok(candidates.remove(0)),
            _ => {
                let file_names: Vec<_> = candidates
                    .iter()
                    .filter_map(ArtifactLocation::file_name)
                    .collect();
                Err(ResolveError::AmbiguousPlugin {
                    identifier: identifier.clone(),
                    reason: format!(
                        "{} artifacts in {} start with {name}: {}",
                        file_names.len(),
                        layout::CONNECTORS_DIR,
                        file_names.join(", ")
                    ),
                })
            }
        }
    }

    /// Direct `.jar` children of `dir`; an absent directory contributes nothing.
    fn artifacts_in(&self, dir: &Path) -> Result<Vec<ArtifactLocation>, ResolveError> {
        if self.entry_kind(dir)? != Some(EntryKind::Dir) {
            return Ok(Vec::new());
        }

        Ok(self
            .list_dir(dir)?
            .into_iter()
            .filter(|(path, kind)| *kind == EntryKind::File && is_artifact(path))
            .map(|(path, _)| ArtifactLocation::new(path))
            .collect())
    }

    fn subdirectories(&self, dir: &Path) -> Result<Vec<std::ffi::OsString>, ResolveError> {
        if self.entry_kind(dir)? != Some(EntryKind::Dir) {
            return Ok(Vec::new());
        }

        Ok(self
            .list_dir(dir)?
            .into_iter()
            .filter(|(_, kind)| *kind == EntryKind::Dir)
            .filter_map(|(path, _)| path.file_name().map(ToOwned::to_owned))
            .collect())
    }

    fn entry_kind(&self, path: &Path) -> Result<Option<EntryKind>, ResolveError> {
        self.reader
            .entry_kind(path)
            .map_err(|err| ResolveError::io("inspect", path, err))
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<(PathBuf, EntryKind)>, ResolveError> {
        self.reader
            .list_dir(dir)
            .map_err(|err| ResolveError::io("list", dir, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::fs::MemoryLayout;
    use std::cell::RefCell;
    use std::io;

    const ROOT: &str = "/st";

    const MAPPING: &str = "\
seatunnel.source.Jdbc=connector-jdbc
seatunnel.sink.Jdbc=connector-jdbc
seatunnel.source.Clickhouse=connector-clickhouse
seatunnel.source.Fake=connector-fake
seatunnel.source.HttpJira=connector-http-jira
seatunnel.source.HttpBase=connector-http
seatunnel.source.Http=connector-http
";

    fn id(text: &str) -> PluginIdentifier {
        text.parse().unwrap()
    }

    fn jdbc() -> PluginIdentifier {
        id("seatunnel.source.Jdbc")
    }

    fn clickhouse() -> PluginIdentifier {
        id("seatunnel.source.Clickhouse")
    }

    fn scenario_layout() -> MemoryLayout {
        MemoryLayout::new()
            .with_file("/st/connectors/connector-jdbc.jar")
            .with_file("/st/connectors/connector-clickhouse.jar")
            .with_file("/st/plugins/connector-jdbc/mysql-driver.jar")
            .with_file("/st/plugins/connector-clickhouse/ch-driver.jar")
            .with_file("/st/plugins/other/common.jar")
            .with_file("/st/plugins/shared-top.jar")
    }

    fn resolver<R: LayoutReader>(reader: R) -> PluginDependencyResolver<R> {
        PluginDependencyResolver::new(
            &LayoutConfig::new(ROOT),
            PluginMapping::parse(MAPPING).unwrap(),
            reader,
        )
    }

    fn paths(artifacts: &[ArtifactLocation]) -> Vec<String> {
        artifacts.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn resolves_scenario_regardless_of_request_order() {
        let resolver = resolver(scenario_layout());
        let expected = vec![
            "/st/connectors/connector-clickhouse.jar",
            "/st/connectors/connector-jdbc.jar",
            "/st/plugins/connector-clickhouse/ch-driver.jar",
            "/st/plugins/connector-jdbc/mysql-driver.jar",
            "/st/plugins/other/common.jar",
            "/st/plugins/shared-top.jar",
        ];

        let forward = resolver
            .plugin_jar_and_dependency_paths(&[jdbc(), clickhouse()])
            .unwrap();
        let backward = resolver
            .plugin_jar_and_dependency_paths(&[clickhouse(), jdbc()])
            .unwrap();

        assert_eq!(paths(&forward), expected);
        assert_eq!(forward, backward);
    }

    #[test]
    fn single_plugin_still_gets_shared_dependencies() {
        let resolver = resolver(scenario_layout());
        let artifacts = resolver.plugin_jar_and_dependency_paths(&[jdbc()]).unwrap();
        assert_eq!(
            paths(&artifacts),
            vec![
                "/st/connectors/connector-jdbc.jar",
                "/st/plugins/connector-jdbc/mysql-driver.jar",
                "/st/plugins/other/common.jar",
                "/st/plugins/shared-top.jar",
            ]
        );
    }

    #[test]
    fn adding_a_plugin_only_grows_the_result() {
        let resolver = resolver(scenario_layout());
        let single: BTreeSet<_> = resolver
            .plugin_jar_and_dependency_paths(&[jdbc()])
            .unwrap()
            .into_iter()
            .collect();
        let both: BTreeSet<_> = resolver
            .plugin_jar_and_dependency_paths(&[jdbc(), clickhouse()])
            .unwrap()
            .into_iter()
            .collect();
        assert!(single.is_subset(&both));
    }

    #[test]
    fn result_is_strictly_sorted() {
        let layout = scenario_layout()
            .with_file("/st/plugins/connector-jdbc/lib/mysql-driver.jar")
            .with_file("/st/plugins/other/mysql-driver.jar")
            .with_file("/st/plugins/a-b/lib/x.jar")
            .with_file("/st/plugins/a/lib/x.jar");
        let artifacts = resolver(layout)
            .plugin_jar_and_dependency_paths(&[jdbc(), clickhouse()])
            .unwrap();

        assert!(artifacts.windows(2).all(|pair| pair[0] < pair[1]));
        let a_b = artifacts
            .iter()
            .position(|a| a.path() == Path::new("/st/plugins/a-b/lib/x.jar"))
            .unwrap();
        let a = artifacts
            .iter()
            .position(|a| a.path() == Path::new("/st/plugins/a/lib/x.jar"))
            .unwrap();
        assert!(a_b < a);
    }

    #[test]
    fn private_lib_directory_is_scanned_but_not_descended() {
        let layout = scenario_layout()
            .with_file("/st/plugins/connector-jdbc/lib/pool.jar")
            .with_file("/st/plugins/connector-jdbc/lib/native/deep.jar")
            .with_file("/st/plugins/connector-jdbc/notes.txt");
        let private = resolver(layout).private_dependencies(&jdbc()).unwrap();
        assert_eq!(
            paths(&private),
            vec![
                "/st/plugins/connector-jdbc/lib/pool.jar",
                "/st/plugins/connector-jdbc/mysql-driver.jar",
            ]
        );
    }

    #[test]
    fn other_plugins_private_directories_are_excluded() {
        let artifacts = resolver(scenario_layout())
            .plugin_jar_and_dependency_paths(&[clickhouse()])
            .unwrap();
        assert!(
            artifacts
                .iter()
                .all(|a| !a.path().starts_with("/st/plugins/connector-jdbc"))
        );
    }

    #[test]
    fn bundle_libraries_are_shared() {
        let layout = scenario_layout()
            .with_file("/st/plugins/otherWithLib/lib/common-dependency3.jar")
            .with_file("/st/plugins/otherWithLib/ignored.jar")
            .with_file("/st/plugins/connector-fake/lib/faker.jar");
        let shared = resolver(layout).shared_dependencies().unwrap();
        assert_eq!(
            paths(&shared),
            vec![
                "/st/plugins/other/common.jar",
                "/st/plugins/otherWithLib/lib/common-dependency3.jar",
                "/st/plugins/shared-top.jar",
            ]
        );
    }

    #[test]
    fn missing_shared_directories_contribute_nothing() {
        let layout = MemoryLayout::new().with_file("/st/connectors/connector-jdbc.jar");
        let artifacts = resolver(layout)
            .plugin_jar_and_dependency_paths(&[jdbc()])
            .unwrap();
        assert_eq!(paths(&artifacts), vec!["/st/connectors/connector-jdbc.jar"]);
    }

    #[test]
    fn missing_primary_fails_whole_call() {
        let layout = scenario_layout().with_file("/st/plugins/connector-fake/faker.jar");
        let fake = id("seatunnel.source.Fake");
        let err = resolver(layout)
            .plugin_jar_and_dependency_paths(&[jdbc(), fake.clone()])
            .unwrap_err();

        match err {
            ResolveError::MissingPluginArtifact { identifier, path } => {
                assert_eq!(identifier, fake);
                assert_eq!(path, PathBuf::from("/st/connectors/connector-fake.jar"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Records every path the resolver asks about.
    struct Recording {
        inner: MemoryLayout,
        touched: RefCell<Vec<PathBuf>>,
    }

    impl LayoutReader for Recording {
        fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
            self.touched.borrow_mut().push(path.to_path_buf());
            self.inner.entry_kind(path)
        }

        fn list_dir(&self, dir: &Path) -> io::Result<Vec<(PathBuf, EntryKind)>> {
            self.touched.borrow_mut().push(dir.to_path_buf());
            self.inner.list_dir(dir)
        }
    }

    #[test]
    fn unmapped_plugin_fails_before_touching_the_filesystem() {
        let reader = Recording {
            inner: scenario_layout(),
            touched: RefCell::new(Vec::new()),
        };
        let resolver = resolver(reader);
        let unknown = id("seatunnel.source.Kafka");

        let err = resolver
            .plugin_jar_and_dependency_paths(&[jdbc(), unknown.clone()])
            .unwrap_err();

        assert!(matches!(err, ResolveError::UnmappedPlugin(ref id) if *id == unknown));
        assert!(resolver.reader.touched.borrow().is_empty());
    }

    #[test]
    fn duplicate_identifier_is_ambiguous() {
        let err = resolver(scenario_layout())
            .primary_artifacts(&[jdbc(), clickhouse(), jdbc()])
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::AmbiguousPlugin { ref identifier, .. } if *identifier == jdbc()
        ));
    }

    #[test]
    fn colliding_install_names_are_ambiguous() {
        let layout = MemoryLayout::new().with_file("/st/connectors/connector-http.jar");
        let err = resolver(layout)
            .primary_artifacts(&[id("seatunnel.source.HttpBase"), id("seatunnel.source.Http")])
            .unwrap_err();
        assert!(matches!(err, ResolveError::AmbiguousPlugin { .. }));
    }

    #[test]
    fn source_and_sink_may_share_a_connector() {
        let primaries = resolver(scenario_layout())
            .primary_artifacts(&[jdbc(), id("seatunnel.sink.Jdbc")])
            .unwrap();
        assert_eq!(primaries.len(), 2);
        assert_eq!(primaries[0], primaries[1]);

        let all = resolver(scenario_layout())
            .plugin_jar_and_dependency_paths(&[jdbc(), id("seatunnel.sink.Jdbc")])
            .unwrap();
        assert_eq!(
            all.iter()
                .filter(|a| a.path() == Path::new("/st/connectors/connector-jdbc.jar"))
                .count(),
            1
        );
    }

    #[test]
    fn primaries_keep_request_order() {
        let primaries = resolver(scenario_layout())
            .primary_artifacts(&[jdbc(), clickhouse()])
            .unwrap();
        assert_eq!(
            paths(&primaries),
            vec![
                "/st/connectors/connector-jdbc.jar",
                "/st/connectors/connector-clickhouse.jar",
            ]
        );
    }

    #[test]
    fn versioned_primary_is_accepted() {
        let layout = MemoryLayout::new()
            .with_file("/st/connectors/connector-http-2.3.4.jar")
            .with_file("/st/connectors/connector-jdbc.jar");
        let primaries = resolver(layout)
            .primary_artifacts(&[id("seatunnel.source.HttpBase")])
            .unwrap();
        assert_eq!(
            paths(&primaries),
            vec!["/st/connectors/connector-http-2.3.4.jar"]
        );
    }

    #[test]
    fn install_name_prefixing_another_artifact_is_ambiguous() {
        let layout = MemoryLayout::new()
            .with_file("/st/connectors/connector-http-jira.jar")
            .with_file("/st/connectors/connector-http.jar");
        let resolver = resolver(layout);

        let request = [id("seatunnel.source.HttpJira"), id("seatunnel.source.HttpBase")];
        let err = resolver.primary_artifacts(&request).unwrap_err();
        match err {
            ResolveError::AmbiguousPlugin { identifier, reason } => {
                assert_eq!(identifier, id("seatunnel.source.HttpBase"));
                assert!(reason.contains("connector-http-jira.jar, connector-http.jar"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let jira = resolver
            .primary_artifacts(&[id("seatunnel.source.HttpJira")])
            .unwrap();
        assert_eq!(paths(&jira), vec!["/st/connectors/connector-http-jira.jar"]);
    }

    #[test]
    fn several_versioned_primaries_are_ambiguous() {
        let layout = MemoryLayout::new()
            .with_file("/st/connectors/connector-jdbc-2.3.3.jar")
            .with_file("/st/connectors/connector-jdbc-2.3.4.jar");
        let err = resolver(layout).primary_artifacts(&[jdbc()]).unwrap_err();
        match err {
            ResolveError::AmbiguousPlugin { reason, .. } => {
                assert!(reason.contains("connector-jdbc-2.3.3.jar, connector-jdbc-2.3.4.jar"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn io_errors_carry_path_and_operation() {
        let layout = scenario_layout()
            .with_unreadable("/st/plugins/connector-jdbc", io::ErrorKind::PermissionDenied);
        let err = resolver(layout)
            .plugin_jar_and_dependency_paths(&[jdbc()])
            .unwrap_err();
        match err {
            ResolveError::Io {
                operation,
                path,
                source,
            } => {
                assert_eq!(operation, "inspect");
                assert_eq!(path, PathBuf::from("/st/plugins/connector-jdbc"));
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unused_shared_dependencies_match_by_file_name() {
        let layout = scenario_layout()
            .with_file("/st/plugins/other/mysql-driver.jar")
            .with_file("/st/plugins/otherWithLib/lib/common-dependency3.jar");
        let resolver = resolver(layout);

        let unused = resolver.unused_shared_dependencies(&[jdbc()]).unwrap();
        assert_eq!(
            paths(&unused),
            vec![
                "/st/plugins/other/common.jar",
                "/st/plugins/otherWithLib/lib/common-dependency3.jar",
                "/st/plugins/shared-top.jar",
            ]
        );

        let everything = resolver.unused_shared_dependencies(&[]).unwrap();
        assert_eq!(everything.len(), 4);
    }

    #[test]
    fn unused_shared_dependencies_require_active_primaries() {
        let err = resolver(scenario_layout())
            .unused_shared_dependencies(&[id("seatunnel.source.Fake")])
            .unwrap_err();
        assert!(matches!(err, ResolveError::MissingPluginArtifact { .. }));
    }

    #[test]
    fn reports_missing_dependency_directories() {
        let missing = resolver(scenario_layout())
            .missing_dependency_directories()
            .unwrap();
        assert_eq!(
            missing,
            vec![
                PathBuf::from("/st/plugins/connector-fake"),
                PathBuf::from("/st/plugins/connector-http"),
                PathBuf::from("/st/plugins/connector-http-jira"),
            ]
        );
    }

    #[test]
    fn cluster_mode_resolves_under_cluster_root() {
        let layout = MemoryLayout::new().with_file("/job/connectors/connector-jdbc.jar");
        let config = LayoutConfig::new(ROOT)
            .with_cluster_root("/job")
            .with_deploy_mode(crate::model::mode::DeployMode::Cluster);
        let resolver =
            PluginDependencyResolver::new(&config, PluginMapping::parse(MAPPING).unwrap(), layout);

        let artifacts = resolver.plugin_jar_and_dependency_paths(&[jdbc()]).unwrap();
        assert_eq!(paths(&artifacts), vec!["/job/connectors/connector-jdbc.jar"]);
    }

    #[test]
    fn resolver_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PluginDependencyResolver<DiskLayout>>();
        assert_send_sync::<PluginDependencyResolver<MemoryLayout>>();
    }
}
