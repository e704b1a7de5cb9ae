//! `skills add`: register a source and declare something it publishes.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, short_sha};
use crate::core::SkillsError;
use crate::discovery::{DiscoveryResult, RepoFormat};
use crate::resolver::reference::ArtifactRef;
use crate::source::{Source, browse_ref};

#[derive(Args)]
pub struct AddCommand {
    /// Repository: `owner/repo`, a URL, or a local path (`#subdir` optional)
    source: String,

    /// Artifact to declare
    #[arg(long, conflicts_with = "collection")]
    artifact: Option<String>,

    /// Collection to declare
    #[arg(long)]
    collection: Option<String>,

    /// Branch, tag or commit to pin the artifact to (defaults to the ref of a browse URL)
    #[arg(long = "ref", value_name = "REF", conflicts_with = "collection")]
    reference: Option<String>,

    /// Skip format detection
    #[arg(long, value_name = "FORMAT")]
    format: Option<String>,
}

impl AddCommand {
    pub async fn execute(self, mut ctx: CommandContext) -> Result<()> {
        let format = self.format.as_deref().map(str::parse::<RepoFormat>).transpose()?;
        let source = Source::parse(&self.source)?.with_format(format);

        if ctx.config.add_source(source.clone())? {
            println!("{} source {} ({})", "Added".green(), source.name.bold(), source.display_url());
        }

        // Collections always follow the default branch
        let reference = match &self.collection {
            Some(_) => None,
            None => self.reference.clone().or_else(|| {
                let from_url = browse_ref(&self.source);
                if let Some(reference) = &from_url {
                    tracing::info!("Pinning to '{}' taken from the browse URL", reference);
                }
                from_url
            }),
        };

        let mut resolver = ctx.resolver();
        let pin = reference.as_deref().unwrap_or("HEAD");
        let (commit, result) = resolver.inspect(&source, pin).await?;
        tracing::debug!("Discovered {} artifact(s) at {}", result.artifacts.len(), commit.sha);

        if let Some(name) = &self.collection {
            if result.find_collection(name).is_none() {
                return Err(SkillsError::CollectionNotFound {
                    name: name.clone(),
                    source_name: source.name.clone(),
                    available: result.collection_names(),
                }
                .into());
            }
            let reference = ArtifactRef::new(source.name.clone(), name.clone(), None);
            ctx.config.add_collection(&reference);
            ctx.save_config()?;
            println!("{} collection {}", "Declared".green(), reference.to_string().bold());
            return Ok(());
        }

        let name = match (&self.artifact, result.artifacts.as_slice()) {
            (Some(name), _) => name.clone(),
            (None, [only]) => only.name.clone(),
            (None, _) => {
                ctx.save_config()?;
                print_available(&source, &result, short_sha(&commit.sha));
                return Ok(());
            }
        };

        if result.find_artifact(&name).is_none() {
            return Err(SkillsError::ArtifactNotFound {
                name,
                source_name: source.name.clone(),
                available: result.artifact_names(),
            }
            .into());
        }

        let reference = ArtifactRef::new(source.name.clone(), name, reference);
        ctx.config.add_artifact(&reference);
        ctx.save_config()?;
        println!("{} artifact {}", "Declared".green(), reference.to_string().bold());
        println!("Run {} to install it", "skills install".cyan());
        Ok(())
    }
}

fn print_available(source: &Source, result: &DiscoveryResult, sha: &str) {
    if result.artifacts.is_empty() {
        println!("{} publishes no artifacts at {}", source.name, sha);
        return;
    }

    println!("{} ({}, {}) publishes:", source.name.bold(), result.format, sha);
    for artifact in &result.artifacts {
        match &artifact.description {
            Some(description) => println!("  {} - {}", artifact.name.cyan(), description),
            None => println!("  {}", artifact.name.cyan()),
        }
    }
    for collection in &result.collections {
        println!(
            "  {} {} ({} artifact(s))",
            "collection".dimmed(),
            collection.name.cyan(),
            collection.artifacts.len()
        );
    }
    println!("Declare one with {}", format!("skills add {} --artifact <name>", source.name).cyan());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        add: AddCommand,
    }

    #[test]
    fn test_ref_without_artifact_is_accepted() {
        let parsed = Harness::try_parse_from(["skills", "o/r", "--ref", "v1"]).unwrap();
        assert_eq!(parsed.add.reference.as_deref(), Some("v1"));
        assert!(parsed.add.artifact.is_none());
    }

    #[test]
    fn test_ref_conflicts_with_collection() {
        assert!(Harness::try_parse_from(["skills", "o/r", "--collection", "c", "--ref", "v1"]).is_err());
        assert!(Harness::try_parse_from(["skills", "o/r", "--artifact", "a", "--collection", "c"]).is_err());
    }
}
