use anyhow::Result;
use skills_cli::core::SkillsError;
use skills_cli::discovery::RepoFormat;
use skills_cli::lockfile::LockFile;
use skills_cli::manifest::ProjectConfig;
use skills_cli::resolver::reference::ArtifactRef;
use skills_cli::resolver::{BatchReport, Outcome, ResolveMode};
use skills_cli::source::Source;
use skills_cli::test_utils::TestGit;

use crate::common::{TestProject, skill_md};

fn declare(config: &mut ProjectConfig, reference: &str) {
    config.add_artifact(&ArtifactRef::parse(reference).unwrap());
}

fn outcome_of<'a>(report: &'a BatchReport, key: &str) -> &'a Outcome {
    let item = report.items.iter().find(|item| item.key == key);
    &item.unwrap_or_else(|| panic!("{key} not in batch")).outcome
}

#[tokio::test]
async fn test_failures_do_not_stop_the_batch() -> Result<()> {
    let project = TestProject::new()?;
    let repo = project
        .remote("good")
        .file("skills/pdf/SKILL.md", &skill_md("pdf", "PDF tools"))
        .file("skills/docx/SKILL.md", &skill_md("docx", "Word tools"))
        .commit("initial")
        .build()?;

    let mut config = ProjectConfig::default();
    config.add_source(Source::new("acme/good", &repo.url))?;
    config.add_source(Source::new(
        "acme/gone",
        format!("file://{}", project.project_path().join("no-such-repo").display()),
    ))?;
    declare(&mut config, "acme/good/pdf");
    declare(&mut config, "acme/good/absent");
    declare(&mut config, "acme/gone/pdf");
    declare(&mut config, "acme/good/docx");

    let mut lock = LockFile::new();
    let mut resolver = project.resolver();
    let report = resolver.resolve_all(&config, &mut lock, ResolveMode::Locked, None).await;

    assert!(matches!(outcome_of(&report, "acme/good/pdf"), Outcome::Added));
    assert!(matches!(outcome_of(&report, "acme/good/docx"), Outcome::Added));
    match outcome_of(&report, "acme/good/absent") {
        Outcome::Failed(err) => match err.downcast_ref::<SkillsError>() {
            Some(SkillsError::ArtifactNotFound { available, .. }) => {
                assert!(available.contains(&"pdf".to_string()));
                assert!(available.contains(&"docx".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        },
        other => panic!("expected failure, got {other:?}"),
    }
    match outcome_of(&report, "acme/gone/pdf") {
        Outcome::Failed(err) => assert!(matches!(
            err.downcast_ref::<SkillsError>(),
            Some(SkillsError::RepositoryUnavailable { .. })
        )),
        other => panic!("expected failure, got {other:?}"),
    }

    assert_eq!(report.failures().count(), 2);
    assert_eq!(lock.len(), 2);
    let entry = lock.get("acme/good/pdf").unwrap();
    assert_eq!(entry.sha, repo.head);
    assert_eq!(entry.path, "skills/pdf");
    assert_eq!(entry.metadata.format, RepoFormat::Simple);
    assert!(entry.integrity.starts_with("sha256:"));
    Ok(())
}

#[tokio::test]
async fn test_changing_the_pin_re_resolves() -> Result<()> {
    let project = TestProject::new()?;
    let repo = project
        .remote("pinned")
        .file("skills/pdf/SKILL.md", &skill_md("pdf", "one"))
        .commit("one")
        .tag("v1")
        .file("skills/pdf/SKILL.md", &skill_md("pdf", "two"))
        .commit("two")
        .tag("v2")
        .file("skills/pdf/SKILL.md", &skill_md("pdf", "three"))
        .commit("three")
        .build()?;

    let mut config = ProjectConfig::default();
    config.add_source(Source::new("acme/pinned", &repo.url))?;
    declare(&mut config, "acme/pinned/pdf@v1");

    let mut lock = LockFile::new();
    project.resolver().resolve_all(&config, &mut lock, ResolveMode::Locked, None).await;
    let v1 = lock.get("acme/pinned/pdf").unwrap().clone();
    assert_eq!(v1.sha, repo.tags["v1"]);
    assert_eq!(v1.reference.as_deref(), Some("v1"));

    // Same declaration again: nothing changes
    let report =
        project.resolver().resolve_all(&config, &mut lock, ResolveMode::Locked, None).await;
    assert!(matches!(outcome_of(&report, "acme/pinned/pdf"), Outcome::UpToDate));

    declare(&mut config, "acme/pinned/pdf@v2");
    let report =
        project.resolver().resolve_all(&config, &mut lock, ResolveMode::Locked, None).await;
    match outcome_of(&report, "acme/pinned/pdf") {
        Outcome::Updated { previous_sha } => assert_eq!(previous_sha, &repo.tags["v1"]),
        other => panic!("expected update, got {other:?}"),
    }
    let v2 = lock.get("acme/pinned/pdf").unwrap();
    assert_eq!(v2.sha, repo.tags["v2"]);
    assert_ne!(v2.integrity, v1.integrity);

    // Dropping the pin follows the default branch
    declare(&mut config, "acme/pinned/pdf");
    project.resolver().resolve_all(&config, &mut lock, ResolveMode::Locked, None).await;
    let head = lock.get("acme/pinned/pdf").unwrap();
    assert_eq!(head.sha, repo.head);
    assert_eq!(head.reference, None);
    Ok(())
}

#[tokio::test]
async fn test_collection_members_defer_to_explicit_pins() -> Result<()> {
    let project = TestProject::new()?;
    let repo = project
        .remote("market")
        .file(
            ".claude-plugin/marketplace.json",
            r#"{"plugins": [{"name": "document-skills", "description": "Office documents",
                "skills": ["./skills/pdf", "./skills/docx", "./skills/xlsx"]}]}"#,
        )
        .file("skills/pdf/SKILL.md", &skill_md("pdf", "old"))
        .file("skills/docx/SKILL.md", &skill_md("docx", "old"))
        .file("skills/xlsx/SKILL.md", &skill_md("xlsx", "old"))
        .commit("initial")
        .tag("v1")
        .file("skills/pdf/SKILL.md", &skill_md("pdf", "new"))
        .commit("newer pdf")
        .build()?;

    let mut config = ProjectConfig::default();
    config.add_source(Source::new("acme/market", &repo.url))?;
    declare(&mut config, "acme/market/pdf@v1");
    config.add_collection(&ArtifactRef::parse("acme/market/document-skills")?);

    let mut lock = LockFile::new();
    let report =
        project.resolver().resolve_all(&config, &mut lock, ResolveMode::Locked, None).await;
    assert!(!report.has_failures());
    assert!(!report.incomplete);

    // pdf resolved once, from the explicit declaration
    let pdf_items: Vec<_> = report.items.iter().filter(|i| i.key == "acme/market/pdf").collect();
    assert_eq!(pdf_items.len(), 1);
    assert_eq!(pdf_items[0].collection, None);
    assert_eq!(lock.get("acme/market/pdf").unwrap().sha, repo.tags["v1"]);

    for member in ["docx", "xlsx"] {
        let key = format!("acme/market/{member}");
        let item = report.items.iter().find(|i| i.key == key).unwrap();
        assert_eq!(item.collection.as_deref(), Some("acme/market/document-skills"));
        let entry = lock.get(&key).unwrap();
        assert_eq!(entry.sha, repo.head);
        assert_eq!(entry.metadata.format, RepoFormat::ClaudeMarketplace);
    }
    Ok(())
}

#[tokio::test]
async fn test_unknown_collection_marks_batch_incomplete() -> Result<()> {
    let project = TestProject::new()?;
    let repo = project
        .remote("simple")
        .file("skills/pdf/SKILL.md", &skill_md("pdf", "x"))
        .commit("initial")
        .build()?;

    let mut config = ProjectConfig::default();
    config.add_source(Source::new("acme/simple", &repo.url))?;
    // hand-edited config: add_collection would drop the pin
    config.collections.push("acme/simple/everything@v1".to_string());

    let mut lock = LockFile::new();
    let report =
        project.resolver().resolve_all(&config, &mut lock, ResolveMode::Locked, None).await;

    assert!(report.incomplete);
    assert!(report.warnings.iter().any(|w| w.contains("ignores the pinned ref")));
    match outcome_of(&report, "acme/simple/everything") {
        Outcome::Failed(err) => assert!(matches!(
            err.downcast_ref::<SkillsError>(),
            Some(SkillsError::CollectionNotFound { .. })
        )),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(lock.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_update_follows_upstream() -> Result<()> {
    let project = TestProject::new()?;
    let repo = project
        .remote("moving")
        .file("skills/pdf/SKILL.md", &skill_md("pdf", "one"))
        .file("skills/docx/SKILL.md", &skill_md("docx", "one"))
        .commit("one")
        .tag("v1")
        .build()?;

    let mut config = ProjectConfig::default();
    config.add_source(Source::new("acme/moving", &repo.url))?;
    declare(&mut config, "acme/moving/pdf");
    declare(&mut config, "acme/moving/docx@v1");

    let mut lock = LockFile::new();
    project.resolver().resolve_all(&config, &mut lock, ResolveMode::Locked, None).await;
    let before = lock.get("acme/moving/pdf").unwrap().clone();

    let git = TestGit::new(&repo.path);
    std::fs::write(repo.path.join("skills/pdf/SKILL.md"), skill_md("pdf", "two"))?;
    git.add_all()?;
    git.commit("two")?;
    let new_head = git.rev_parse_head()?;

    // Locked mode never looks upstream
    let report =
        project.resolver().resolve_all(&config, &mut lock, ResolveMode::Locked, None).await;
    assert!(matches!(outcome_of(&report, "acme/moving/pdf"), Outcome::UpToDate));
    assert_eq!(lock.get("acme/moving/pdf").unwrap().sha, before.sha);

    let report =
        project.resolver().resolve_all(&config, &mut lock, ResolveMode::Update, None).await;
    match outcome_of(&report, "acme/moving/pdf") {
        Outcome::Updated { previous_sha } => assert_eq!(previous_sha, &before.sha),
        other => panic!("expected update, got {other:?}"),
    }
    assert!(matches!(outcome_of(&report, "acme/moving/docx"), Outcome::UpToDate));
    assert_eq!(lock.get("acme/moving/pdf").unwrap().sha, new_head);
    assert_eq!(lock.get("acme/moving/docx").unwrap().sha, repo.tags["v1"]);
    Ok(())
}

#[tokio::test]
async fn test_update_filter_limits_the_batch() -> Result<()> {
    let project = TestProject::new()?;
    let repo = project
        .remote("filtered")
        .file("skills/pdf/SKILL.md", &skill_md("pdf", "x"))
        .file("skills/docx/SKILL.md", &skill_md("docx", "x"))
        .commit("initial")
        .build()?;

    let mut config = ProjectConfig::default();
    config.add_source(Source::new("acme/filtered", &repo.url))?;
    declare(&mut config, "acme/filtered/pdf");
    declare(&mut config, "acme/filtered/docx");

    let mut lock = LockFile::new();
    let filter = vec!["pdf".to_string()];
    let report = project
        .resolver()
        .resolve_all(&config, &mut lock, ResolveMode::Update, Some(&filter))
        .await;

    assert_eq!(report.items.len(), 1);
    assert!(lock.get("acme/filtered/pdf").is_some());
    assert!(lock.get("acme/filtered/docx").is_none());
    Ok(())
}

#[tokio::test]
async fn test_unnamed_root_artifact_keeps_its_name_across_commits() -> Result<()> {
    let project = TestProject::new()?;
    let repo = project
        .remote("pdf-skill")
        .file("SKILL.md", "---\ndescription: PDF tools\n---\n\none\n")
        .commit("one")
        .build()?;

    let source = Source::new("acme/pdf-skill", &repo.url);
    let mut config = ProjectConfig::default();
    config.add_source(source.clone())?;

    let mut resolver = project.resolver();
    let (commit, result) = resolver.inspect(&source, "HEAD").await?;
    assert_eq!(commit.sha, repo.head);
    assert_eq!(result.format, RepoFormat::Unknown);
    assert_eq!(result.artifact_names(), vec!["pdf-skill"]);

    declare(&mut config, "acme/pdf-skill/pdf-skill");
    let mut lock = LockFile::new();
    resolver.resolve_all(&config, &mut lock, ResolveMode::Locked, None).await;
    assert_eq!(lock.get("acme/pdf-skill/pdf-skill").unwrap().path, ".");

    let git = TestGit::new(&repo.path);
    std::fs::write(repo.path.join("SKILL.md"), "---\ndescription: PDF tools\n---\n\ntwo\n")?;
    git.add_all()?;
    git.commit("two")?;
    let new_head = git.rev_parse_head()?;

    let report =
        project.resolver().resolve_all(&config, &mut lock, ResolveMode::Update, None).await;
    assert!(!report.has_failures());
    assert_eq!(lock.get("acme/pdf-skill/pdf-skill").unwrap().sha, new_head);
    Ok(())
}

#[tokio::test]
async fn test_unnamed_plugin_collection_is_named_after_the_repository() -> Result<()> {
    let project = TestProject::new()?;
    let repo = project
        .remote("office-plugin")
        .file(".claude-plugin/plugin.json", "{}")
        .file("skills/pdf/SKILL.md", &skill_md("pdf", "x"))
        .commit("initial")
        .build()?;

    let source = Source::new("acme/office-plugin", &repo.url);
    let (_, result) = project.resolver().inspect(&source, "HEAD").await?;
    assert_eq!(result.format, RepoFormat::ClaudePlugin);
    assert_eq!(result.collection_names(), vec!["office-plugin"]);
    Ok(())
}
