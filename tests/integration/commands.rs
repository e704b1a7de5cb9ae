use anyhow::Result;
use predicates::prelude::*;
use skills_cli::source::Source;
use skills_cli::test_utils::{FixtureRepo, TestGit};

use crate::common::{TestProject, skill_md};

fn office_repo(project: &TestProject) -> Result<FixtureRepo> {
    project
        .remote("office")
        .file("skills/pdf/SKILL.md", &skill_md("pdf", "PDF v1"))
        .file("skills/pdf/scripts/extract.py", "print('v1')")
        .file("skills/docx/SKILL.md", &skill_md("docx", "Word v1"))
        .commit("initial")
        .tag("v1")
        .file("skills/docx/SKILL.md", &skill_md("docx", "Word v2"))
        .commit("docx v2")
        .build()
}

fn source_name(repo: &FixtureRepo) -> String {
    Source::parse(&repo.path.display().to_string()).unwrap().name
}

#[test]
fn test_add_declares_the_only_artifact() -> Result<()> {
    let project = TestProject::new()?;
    let repo = project
        .remote("single")
        .file("skills/pdf/SKILL.md", &skill_md("pdf", "only one"))
        .commit("initial")
        .build()?;
    let path = repo.path.display().to_string();

    project.run(&["add", &path]).success().stdout(predicate::str::contains("Declared artifact"));

    let config = project.load_config()?;
    let name = source_name(&repo);
    assert_eq!(config.sources.len(), 1);
    assert_eq!(config.sources[0].url, repo.url);
    assert_eq!(config.artifacts, vec![format!("{name}/pdf")]);
    Ok(())
}

#[test]
fn test_add_lists_choices_then_declares_pinned_artifact() -> Result<()> {
    let project = TestProject::new()?;
    let repo = office_repo(&project)?;
    let path = repo.path.display().to_string();

    project
        .run(&["add", &path])
        .success()
        .stdout(predicate::str::contains("pdf").and(predicate::str::contains("docx")));
    assert!(project.load_config()?.artifacts.is_empty());

    project.run(&["add", &path, "--artifact", "docx", "--ref", "v1"]).success();
    let config = project.load_config()?;
    assert_eq!(config.sources.len(), 1);
    assert_eq!(config.artifacts, vec![format!("{}/docx@v1", source_name(&repo))]);

    project
        .run(&["add", &path, "--artifact", "pptx"])
        .failure()
        .stderr(predicate::str::contains("pptx"));
    Ok(())
}

#[test]
fn test_install_copies_into_every_target() -> Result<()> {
    let project = TestProject::new()?;
    let repo = office_repo(&project)?;
    let path = repo.path.display().to_string();
    let name = source_name(&repo);

    project.run(&["add", &path, "--artifact", "pdf"]).success();
    project.run(&["add", &path, "--artifact", "docx", "--ref", "v1"]).success();
    project.run(&["install"]).success().stdout(predicate::str::contains("Installed 2"));

    for dir in [".claude/skills", ".opencode/skills", ".cursor/skills", ".codex/skills"] {
        let base = project.project_path().join(dir);
        assert!(base.join("pdf/scripts/extract.py").is_file(), "{dir} is missing pdf");
        let docx = std::fs::read_to_string(base.join("docx/SKILL.md"))?;
        assert!(docx.contains("Word v1"), "{dir} has the wrong docx");
    }

    let lock = project.load_lock()?;
    assert_eq!(lock.len(), 2);
    assert_eq!(lock.get(&format!("{name}/docx")).unwrap().sha, repo.tags["v1"]);
    assert_eq!(lock.get(&format!("{name}/pdf")).unwrap().sha, repo.head);

    // a second install reuses the lock and changes nothing
    let before = std::fs::read_to_string(project.project_path().join("skills-lock.json"))?;
    project.run(&["install"]).success();
    let after = std::fs::read_to_string(project.project_path().join("skills-lock.json"))?;
    assert_eq!(before, after);
    Ok(())
}

#[test]
fn test_install_reports_failures_but_installs_the_rest() -> Result<()> {
    let project = TestProject::new()?;
    let repo = office_repo(&project)?;
    let path = repo.path.display().to_string();
    let name = source_name(&repo);

    project.run(&["add", &path, "--artifact", "pdf"]).success();
    let mut config = project.load_config()?;
    config.artifacts.push(format!("{name}/missing"));
    project.write_config(&config)?;

    project
        .run(&["install"])
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing"));

    assert!(project.project_path().join(".claude/skills/pdf/SKILL.md").is_file());
    let lock = project.load_lock()?;
    assert!(lock.get(&format!("{name}/pdf")).is_some());
    assert!(lock.get(&format!("{name}/missing")).is_none());
    Ok(())
}

#[test]
fn test_install_prunes_undeclared_entries() -> Result<()> {
    let project = TestProject::new()?;
    let repo = office_repo(&project)?;
    let path = repo.path.display().to_string();
    let name = source_name(&repo);

    project.run(&["add", &path, "--artifact", "pdf"]).success();
    project.run(&["add", &path, "--artifact", "docx"]).success();
    project.run(&["install"]).success();

    let mut config = project.load_config()?;
    config.artifacts.retain(|declared| !declared.ends_with("/docx"));
    project.write_config(&config)?;
    project.run(&["install"]).success();

    let lock = project.load_lock()?;
    assert_eq!(lock.len(), 1);
    assert!(lock.get(&format!("{name}/docx")).is_none());
    assert!(!project.project_path().join(".claude/skills/docx").exists());
    assert!(project.project_path().join(".claude/skills/pdf").exists());
    Ok(())
}

#[test]
fn test_verify_detects_tampered_snapshot() -> Result<()> {
    let project = TestProject::new()?;
    let repo = office_repo(&project)?;
    let path = repo.path.display().to_string();

    project.run(&["add", &path, "--artifact", "pdf"]).success();
    project.run(&["install"]).success();
    project.run(&["verify"]).success().stdout(predicate::str::contains("Verified 1"));

    let snapshot = project.layout().cache_dir.join(&repo.head).join("skills/pdf/SKILL.md");
    std::fs::write(&snapshot, "tampered")?;

    project
        .run(&["verify"])
        .failure()
        .code(1)
        .stderr(predicate::str::contains("expected sha256:"));
    Ok(())
}

#[test]
fn test_update_picks_up_new_commits() -> Result<()> {
    let project = TestProject::new()?;
    let repo = office_repo(&project)?;
    let path = repo.path.display().to_string();
    let name = source_name(&repo);

    project.run(&["add", &path, "--artifact", "pdf"]).success();
    project.run(&["install"]).success();

    let git = TestGit::new(&repo.path);
    std::fs::write(repo.path.join("skills/pdf/SKILL.md"), skill_md("pdf", "PDF v2"))?;
    git.add_all()?;
    git.commit("pdf v2")?;
    let new_head = git.rev_parse_head()?;

    project.run(&["install"]).success();
    let installed = std::fs::read_to_string(project.project_path().join(".claude/skills/pdf/SKILL.md"))?;
    assert!(installed.contains("PDF v1"));

    project.run(&["update", "pdf"]).success().stdout(predicate::str::contains("Updated 1"));
    let installed = std::fs::read_to_string(project.project_path().join(".claude/skills/pdf/SKILL.md"))?;
    assert!(installed.contains("PDF v2"));
    assert_eq!(project.load_lock()?.get(&format!("{name}/pdf")).unwrap().sha, new_head);

    project.run(&["update"]).success().stdout(predicate::str::contains("up to date"));
    Ok(())
}

#[test]
fn test_list_and_remove() -> Result<()> {
    let project = TestProject::new()?;
    let repo = office_repo(&project)?;
    let path = repo.path.display().to_string();
    let name = source_name(&repo);

    project.run(&["list"]).success().stdout(predicate::str::contains("No artifacts declared"));

    project.run(&["add", &path, "--artifact", "pdf"]).success();
    project.run(&["list"]).success().stdout(predicate::str::contains("not installed"));

    project.run(&["install"]).success();
    project
        .run(&["list"])
        .success()
        .stdout(predicate::str::contains(format!("{name}/pdf")).and(predicate::str::contains(&repo.head[..8])));

    project.run(&["remove", &format!("{name}/pdf")]).success();
    assert!(project.load_config()?.artifacts.is_empty());
    assert!(project.load_lock()?.is_empty());
    assert!(!project.project_path().join(".claude/skills/pdf").exists());

    project.run(&["remove", &format!("{name}/pdf")]).failure();
    Ok(())
}

#[test]
fn test_add_pins_the_only_artifact() -> Result<()> {
    let project = TestProject::new()?;
    let repo = project
        .remote("single-pinned")
        .file("skills/pdf/SKILL.md", &skill_md("pdf", "v1"))
        .commit("initial")
        .tag("v1")
        .file("skills/pdf/SKILL.md", &skill_md("pdf", "v2"))
        .commit("second")
        .build()?;
    let path = repo.path.display().to_string();

    project.run(&["add", &path, "--ref", "v1"]).success();
    let config = project.load_config()?;
    assert_eq!(config.artifacts, vec![format!("{}/pdf@v1", source_name(&repo))]);

    project.run(&["add", &path, "--collection", "all", "--ref", "v1"]).failure().code(2);
    Ok(())
}

#[test]
fn test_add_rejects_a_changed_subdir() -> Result<()> {
    let project = TestProject::new()?;
    let repo = office_repo(&project)?;
    let path = repo.path.display().to_string();

    project.run(&["add", &path, "--artifact", "pdf"]).success();
    project
        .run(&["add", &format!("{path}#skills"), "--artifact", "docx"])
        .failure()
        .stderr(predicate::str::contains("already declared"));

    let config = project.load_config()?;
    assert_eq!(config.sources.len(), 1);
    assert_eq!(config.sources[0].subdir, None);
    assert_eq!(config.artifacts.len(), 1);
    Ok(())
}

#[test]
fn test_update_keeps_going_when_one_reinstall_fails() -> Result<()> {
    let project = TestProject::new()?;
    let repo = office_repo(&project)?;
    let path = repo.path.display().to_string();
    let name = source_name(&repo);

    project.run(&["add", &path, "--artifact", "pdf"]).success();
    project.run(&["add", &path, "--artifact", "docx"]).success();
    project.run(&["install"]).success();

    let git = TestGit::new(&repo.path);
    std::fs::write(repo.path.join("skills/pdf/SKILL.md"), skill_md("pdf", "PDF v2"))?;
    std::fs::write(repo.path.join("skills/docx/SKILL.md"), skill_md("docx", "Word v3"))?;
    git.add_all()?;
    git.commit("both change")?;
    let new_head = git.rev_parse_head()?;

    // A plain file where the docx copy belongs cannot be replaced
    let blocked = project.project_path().join(".claude/skills/docx");
    std::fs::remove_dir_all(&blocked)?;
    std::fs::write(&blocked, "not a directory")?;

    project
        .run(&["update"])
        .failure()
        .code(1)
        .stderr(predicate::str::contains(format!("{name}/docx")));

    let pdf = std::fs::read_to_string(project.project_path().join(".claude/skills/pdf/SKILL.md"))?;
    assert!(pdf.contains("PDF v2"));
    let lock = project.load_lock()?;
    assert_eq!(lock.get(&format!("{name}/pdf")).unwrap().sha, new_head);
    assert_eq!(lock.get(&format!("{name}/docx")).unwrap().sha, new_head);
    Ok(())
}
