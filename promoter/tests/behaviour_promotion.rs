//! Behaviour tests for release promotion.
//!
//! These scenarios drive the promotion pipeline against a temporary site and
//! check the registry, content tree, and project index afterwards.

mod support;

use docs_release::ReleaseConfig;
use docs_release_promoter::cli::split_version_list;
use docs_release_promoter::error::PromoteError;
use docs_release_promoter::pipeline::{
    PromotionPlan, PromotionReport, PromotionRequest, Promoter,
};
use docs_release_promoter::registry::VersionRegistry;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use support::{INDEX, REGISTRY, ScriptedFetcher, Site};

const REGISTRY_PATH: &str = "data/eso_versions.toml";
const INDEX_PATH: &str = "content/en/eso-docs/_index.md";

struct PromotionWorld {
    site: Option<Site>,
    rollback: bool,
    report: Option<PromotionReport>,
    plan: Option<PromotionPlan>,
    error: Option<PromoteError>,
}

impl Default for PromotionWorld {
    fn default() -> Self {
        Self {
            site: None,
            rollback: true,
            report: None,
            plan: None,
            error: None,
        }
    }
}

impl PromotionWorld {
    fn site(&self) -> &Site {
        self.site.as_ref().expect("site prepared")
    }

    fn registry(&self) -> VersionRegistry {
        VersionRegistry::load(&self.site().path(REGISTRY_PATH)).expect("registry loads")
    }
}

#[fixture]
fn world() -> PromotionWorld {
    PromotionWorld::default()
}

fn request(project: &str, tag: &str, versions: &str) -> PromotionRequest {
    PromotionRequest {
        project: project.to_owned(),
        tag: tag.to_owned(),
        release_date: "2025-03-01".to_owned(),
        tested_versions: Some(split_version_list(versions)),
    }
}

#[given("a documentation site whose latest eso release is \"v0.14.0\"")]
fn given_site(world: &mut PromotionWorld) {
    world.site = Some(Site::new());
}

#[given("the unreleased content is missing")]
fn given_unreleased_missing(world: &mut PromotionWorld) {
    std::fs::remove_dir_all(world.site().path("content/en/eso-docs/unreleased"))
        .expect("remove unreleased content");
}

#[given("the project index is missing")]
fn given_index_missing(world: &mut PromotionWorld) {
    std::fs::remove_file(world.site().path(INDEX_PATH)).expect("remove project index");
}

#[given("rollback is disabled")]
fn given_rollback_disabled(world: &mut PromotionWorld) {
    world.rollback = false;
}

#[when("release \"{tag}\" of \"{project}\" is promoted with tested versions \"{versions}\"")]
fn when_promoted(world: &mut PromotionWorld, tag: String, project: String, versions: String) {
    let config = ReleaseConfig::default();
    let fetcher = ScriptedFetcher::offline();
    let promoter =
        Promoter::new(&config, world.site().root(), &fetcher).with_rollback(world.rollback);
    let mut progress = Vec::new();

    match promoter.run(&request(&project, &tag, &versions), &mut progress) {
        Ok(report) => world.report = Some(report),
        Err(error) => world.error = Some(error),
    }
    assert_eq!(fetcher.calls(), 0, "explicit versions must not hit the network");
}

#[when("release \"{tag}\" of \"{project}\" is planned with tested versions \"{versions}\"")]
fn when_planned(world: &mut PromotionWorld, tag: String, project: String, versions: String) {
    let config = ReleaseConfig::default();
    let fetcher = ScriptedFetcher::offline();
    let promoter = Promoter::new(&config, world.site().root(), &fetcher);

    match promoter.plan(&request(&project, &tag, &versions), &mut Vec::new()) {
        Ok(plan) => world.plan = Some(plan),
        Err(error) => world.error = Some(error),
    }
}

#[then("the promotion succeeds")]
fn then_succeeds(world: &mut PromotionWorld) {
    assert!(world.error.is_none(), "unexpected error: {:?}", world.error);
    let report = world.report.as_ref().expect("report available");
    assert_eq!(report.old_latest, "v0.14.0");
    assert_eq!(report.tested_versions, vec!["v1.32", "v1.33"]);
    assert_eq!(report.index_links, 1);
}

#[then("the registry lists \"{tag}\" first as the only latest release")]
fn then_registry_latest(world: &mut PromotionWorld, tag: String) {
    let registry = world.registry();
    let (index, latest) = registry.find_latest().expect("latest release");
    assert_eq!(index, 0);
    assert_eq!(latest.tag, tag);
    assert_eq!(latest.version, tag);
    assert_eq!(latest.url, format!("/eso-docs/{tag}/"));
    assert_eq!(registry.records().iter().filter(|r| r.latest).count(), 1);
}

#[then("release \"{tag}\" is kept but no longer latest")]
fn then_superseded(world: &mut PromotionWorld, tag: String) {
    let registry = world.registry();
    let record = registry
        .records()
        .iter()
        .find(|record| record.tag == tag)
        .expect("superseded release kept");
    assert!(!record.latest);
    assert_eq!(record.display_version(), tag);
}

#[then("the \"{tag}\" content tree contains the unreleased guides")]
fn then_content_copied(world: &mut PromotionWorld, tag: String) {
    let guide = world
        .site()
        .read(&format!("content/en/eso-docs/{tag}/guides/getting-started.md"));
    assert_eq!(guide, "# Getting started\n");
}

#[then("the \"{tag}\" landing page is titled \"{title}\"")]
fn then_landing_page(world: &mut PromotionWorld, tag: String, title: String) {
    let page = world
        .site()
        .read(&format!("content/en/eso-docs/{tag}/_index.md"));
    assert!(page.contains(&format!("title = \"{title}\"")));
    assert!(page.contains(&format!("project_version = \"{tag}\"")));
}

#[then("the project index links to \"{tag}\"")]
fn then_index_links(world: &mut PromotionWorld, tag: String) {
    let index = world.site().read(INDEX_PATH);
    assert!(index.contains(&format!("[latest version](/eso-docs/{tag}/)")));
}

#[then("the unreleased content is unchanged")]
fn then_unreleased_unchanged(world: &mut PromotionWorld) {
    assert_eq!(
        world.site().read("content/en/eso-docs/unreleased/_index.md"),
        "unreleased\n"
    );
    assert_eq!(
        world
            .site()
            .read("content/en/eso-docs/unreleased/guides/getting-started.md"),
        "# Getting started\n"
    );
}

#[then("the promotion fails while \"{stage}\"")]
fn then_fails_while(world: &mut PromotionWorld, stage: String) {
    let error = world.error.as_ref().expect("promotion failed");
    assert_eq!(error.stage().map(|s| s.to_string()), Some(stage));
}

#[then("the promotion is rejected as a usage error")]
fn then_usage_error(world: &mut PromotionWorld) {
    let error = world.error.as_ref().expect("promotion failed");
    assert!(matches!(error, PromoteError::Usage { .. }), "got {error:?}");
}

#[then("the registry is unchanged")]
fn then_registry_unchanged(world: &mut PromotionWorld) {
    assert_eq!(world.site().read(REGISTRY_PATH), REGISTRY);
}

#[then("the project index is unchanged")]
fn then_index_unchanged(world: &mut PromotionWorld) {
    assert_eq!(world.site().read(INDEX_PATH), INDEX);
}

#[then("no \"{tag}\" content tree exists")]
fn then_no_content_tree(world: &mut PromotionWorld, tag: String) {
    assert!(!world.site().path(&format!("content/en/eso-docs/{tag}")).exists());
}

#[then("the plan supersedes \"{tag}\"")]
fn then_plan_supersedes(world: &mut PromotionWorld, tag: String) {
    let plan = world.plan.as_ref().expect("plan available");
    assert_eq!(plan.old_latest, tag);
    assert!(!plan.version_dir_exists);
    assert_eq!(plan.new_record.tested_k8s_versions, vec!["v1.32"]);
}

#[scenario(path = "tests/features/promotion.feature", name = "Promote a new release")]
fn scenario_promote_new_release(world: PromotionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/promotion.feature",
    name = "Reject a release that already exists"
)]
fn scenario_reject_duplicate(world: PromotionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/promotion.feature",
    name = "Roll back when content promotion fails"
)]
fn scenario_rollback_on_copy_failure(world: PromotionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/promotion.feature",
    name = "Leave partial changes when rollback is disabled"
)]
fn scenario_no_rollback(world: PromotionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/promotion.feature",
    name = "Roll back the registry when the project index is missing"
)]
fn scenario_rollback_on_index_failure(world: PromotionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/promotion.feature",
    name = "Plan a release without touching the site"
)]
fn scenario_plan_only(world: PromotionWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/promotion.feature", name = "Reject an unknown project")]
fn scenario_unknown_project(world: PromotionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/promotion.feature",
    name = "Reject a tag that names the unreleased tree"
)]
fn scenario_reject_unreleased_tag(world: PromotionWorld) {
    let _ = world;
}
