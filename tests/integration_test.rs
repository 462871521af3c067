use anyhow::{ensure, Result};
use git2::{BranchType, Repository, RepositoryInitOptions, Signature};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::rc::Rc;
use subsplit::git::GitRepository;
use subsplit::splitter::Splitter;
use subsplit::utils::{NullOutput, Process};
use tempfile::TempDir;

/// A monorepo clone, its bare origin and a bare library repository
struct TestMonorepo {
    temp_dir: TempDir,
    mono_path: PathBuf,
    library_path: PathBuf,
    repo: Repository,
}

impl TestMonorepo {
    fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let origin_path = temp_dir.path().join("origin.git");
        let library_path = temp_dir.path().join("lib-a.git");
        let mono_path = temp_dir.path().join("mono");

        let mut bare = RepositoryInitOptions::new();
        bare.bare(true).initial_head("main");
        Repository::init_opts(&origin_path, &bare)?;
        Repository::init_opts(&library_path, &bare)?;

        let mut options = RepositoryInitOptions::new();
        options.initial_head("main");
        let repo = Repository::init_opts(&mono_path, &options)?;

        // Configure git user for commits
        let mut config = repo.config()?;
        config.set_str("user.name", "Test User")?;
        config.set_str("user.email", "test@example.com")?;

        repo.remote("origin", &origin_path.display().to_string())?;

        Ok(Self {
            temp_dir,
            mono_path,
            library_path,
            repo,
        })
    }

    fn commit_file(&self, path: &str, content: &str, message: &str) -> Result<git2::Oid> {
        let file_path = self.mono_path.join(path);
        fs::create_dir_all(file_path.parent().unwrap_or(&self.mono_path))?;
        fs::write(&file_path, content)?;

        let mut index = self.repo.index()?;
        index.add_path(Path::new(path))?;
        index.write()?;

        let signature = Signature::now("Test User", "test@example.com")?;
        let tree = self.repo.find_tree(index.write_tree()?)?;
        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        Ok(self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?)
    }

    fn git(&self, args: &[&str]) -> Result<Output> {
        let output = Command::new("git").args(args).current_dir(&self.mono_path).output()?;
        ensure!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        Ok(output)
    }

    /// Pushes main to the origin and refreshes `origin/main`.
    fn publish(&self) -> Result<()> {
        self.git(&["push", "origin", "main"])?;
        self.git(&["fetch", "origin"])?;
        Ok(())
    }

    fn home(&self) -> PathBuf {
        self.temp_dir.path().join("home")
    }

    fn write_config(&self, content: &str) -> Result<PathBuf> {
        let path = self.temp_dir.path().join("subsplit.json");
        fs::write(&path, content)?;
        Ok(path)
    }

    fn subsplit(&self, args: &[&str]) -> Result<Output> {
        Ok(Command::new(env!("CARGO_BIN_EXE_subsplit"))
            .args(args)
            .env("SUBSPLIT_HOME", self.home())
            .env_remove("SUBSPLIT_CONFIG")
            .current_dir(&self.mono_path)
            .output()?)
    }

    fn local_branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for branch in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn remote_names(&self) -> Result<Vec<String>> {
        Ok(self.repo.remotes()?.iter().flatten().map(String::from).collect())
    }
}

fn git_installed() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn git_subtree_installed() -> bool {
    let Ok(output) = Command::new("git").arg("--exec-path").output() else {
        return false;
    };
    let exec_path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Path::new(&exec_path).join("git-subtree").exists()
}

#[test]
fn prepare_and_terminate_restore_the_repository() -> Result<()> {
    if !git_installed() {
        eprintln!("git is not installed, skipping");
        return Ok(());
    }

    let mono = TestMonorepo::new()?;
    mono.commit_file("README.md", "# mono\n", "Initial commit")?;
    mono.publish()?;

    let splitter = Splitter::with_default_adapters(Process::new(&mono.mono_path), Rc::new(NullOutput));
    let git = GitRepository::open_at(&mono.mono_path)?;

    splitter.prepare("origin", "main")?;
    assert_eq!(git.current_branch()?.as_deref(), Some("subtree__main"));

    splitter.terminate("origin", "main");
    assert_eq!(git.current_branch()?.as_deref(), Some("main"));
    assert_eq!(mono.local_branches()?, vec!["main"]);

    Ok(())
}

#[test]
fn failed_split_leaves_no_alias_or_branch() -> Result<()> {
    if !git_installed() {
        eprintln!("git is not installed, skipping");
        return Ok(());
    }

    let mono = TestMonorepo::new()?;
    mono.commit_file("src/LibA/a.txt", "a\n", "Add LibA")?;
    mono.publish()?;

    let missing = mono.temp_dir.path().join("missing.git").display().to_string();
    let splitter = Splitter::with_default_adapters(Process::new(&mono.mono_path), Rc::new(NullOutput));

    let staged = splitter.stage("origin", "main")?;
    assert!(!staged.split("src/LibA", &missing, true));
    staged.finish();

    assert_eq!(mono.remote_names()?, vec!["origin"]);
    assert_eq!(mono.local_branches()?, vec!["main"]);

    Ok(())
}

#[test]
fn split_command_pushes_the_library_history() -> Result<()> {
    if !git_installed() || !git_subtree_installed() {
        eprintln!("git subtree is not installed, skipping");
        return Ok(());
    }

    let mono = TestMonorepo::new()?;
    mono.commit_file("README.md", "# mono\n", "Initial commit")?;
    mono.commit_file("src/LibA/a.txt", "a\n", "Add LibA")?;
    mono.commit_file("src/LibB/b.txt", "b\n", "Add LibB")?;
    mono.commit_file("src/LibA/more.txt", "more\n", "Grow LibA")?;
    mono.publish()?;

    let config = mono.write_config(&format!(
        r#"{{"adapter": "git-subtree", "libraries": {{"src/LibA": "{}", "src/LibB": "{}"}}}}"#,
        mono.library_path.display(),
        mono.temp_dir.path().join("lib-b.git").display()
    ))?;

    let output = mono.subsplit(&["split", "-c", &config.display().to_string()])?;
    assert!(
        output.status.success(),
        "split failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    // Only LibA changed in the last commit, its files land at the root.
    let library = Repository::open_bare(&mono.library_path)?;
    let tip = library.find_branch("main", BranchType::Local)?.get().peel_to_commit()?;
    let tree = tip.tree()?;
    assert!(tree.get_name("a.txt").is_some());
    assert!(tree.get_name("more.txt").is_some());
    assert!(tree.get_name("README.md").is_none());
    assert!(tip.message().unwrap_or_default().starts_with("Grow LibA"));

    assert_eq!(mono.remote_names()?, vec!["origin"]);
    assert_eq!(mono.local_branches()?, vec!["main"]);
    let git = GitRepository::open_at(&mono.mono_path)?;
    assert_eq!(git.current_branch()?.as_deref(), Some("main"));

    Ok(())
}

#[test]
fn split_command_rejects_unknown_names() -> Result<()> {
    if !git_installed() {
        eprintln!("git is not installed, skipping");
        return Ok(());
    }

    let mono = TestMonorepo::new()?;
    mono.commit_file("src/LibA/a.txt", "a\n", "Add LibA")?;
    mono.publish()?;
    let config = mono.write_config(r#"{"libraries": {"src/LibA": "git@example.com:org/a.git"}}"#)?;
    let config = config.display().to_string();

    let output = mono.subsplit(&["split", "-c", &config, "--adapter", "svn-split"])?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("The \"svn-split\" splitter adapter does not exist"));

    let output = mono.subsplit(&["split", "-c", &config, "-b", "2.0"])?;
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("The \"2.0\" branch does not exist"));

    let output = mono.subsplit(&["split", "-c", &config, "-R", "upstream"])?;
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("available remotes: origin"));

    // Nothing was touched.
    assert_eq!(mono.remote_names()?, vec!["origin"]);
    assert_eq!(mono.local_branches()?, vec!["main"]);

    Ok(())
}

#[test]
fn validate_command_exit_codes() -> Result<()> {
    let mono = TestMonorepo::new()?;

    let output = mono.subsplit(&["validate", "missing.json"])?;
    assert_eq!(output.status.code(), Some(3));

    let warned = mono.write_config(r#"{"libraries": {"src/LibA": "not-a-url"}}"#)?;
    let warned = warned.display().to_string();
    assert_eq!(mono.subsplit(&["validate", &warned])?.status.code(), Some(0));
    assert_eq!(mono.subsplit(&["validate", "--strict", &warned])?.status.code(), Some(1));

    let invalid = mono.write_config(r#"{"libraries": ["src/LibA"]}"#)?;
    let invalid = invalid.display().to_string();
    let output = mono.subsplit(&["validate", &invalid])?;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[error]"));
    assert!(!output.stderr.contains(&0x1b), "piped output must stay plain");

    // Without a file argument the project file is validated.
    fs::write(mono.mono_path.join(".subsplit.json"), r#"{"branches": ["main"]}"#)?;
    assert_eq!(mono.subsplit(&["validate"])?.status.code(), Some(0));

    Ok(())
}

#[test]
fn config_command_edits_the_selected_file() -> Result<()> {
    let mono = TestMonorepo::new()?;

    let output = mono.subsplit(&["config", "library", "add", "src/LibA", "git@example.com:org/a.git"])?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    mono.subsplit(&["config", "branch", "add", "main"])?;
    mono.subsplit(&["config", "--global", "set", "timeout", "600"])?;

    let project: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(mono.mono_path.join(".subsplit.json"))?)?;
    assert_eq!(project["libraries"]["src/LibA"], "git@example.com:org/a.git");
    assert_eq!(project["branches"], serde_json::json!(["main"]));

    let global: serde_json::Value = serde_json::from_str(&fs::read_to_string(mono.home().join("config.json"))?)?;
    assert_eq!(global["timeout"], 600);

    let output = mono.subsplit(&["config", "get", "timeout"])?;
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "600");

    let output = mono.subsplit(&["config", "--global", "--global-repo", "list"])?;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot be used with"));

    let output = mono.subsplit(&["-c", "other.json", "config", "--global", "list"])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot be used with"));

    Ok(())
}
