//! Command-line driver for a CDS console session
//!
//! Loads a project and its entities through the session stores and prints
//! what ended up cached.

use anyhow::{Context, Result};
use cds_cache::CacheKey;
use cds_model::{Application, EntityKind, LoadOpt, ProjectKey};
use cds_store::{ApplicationCommand, Session, SessionConfig};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const INDEXES: [LoadOpt; 4] = [
    LoadOpt::ApplicationNames,
    LoadOpt::PipelineNames,
    LoadOpt::WorkflowNames,
    LoadOpt::EnvironmentNames,
];

fn cli() -> Command {
    let key = || Arg::new("key").required(true).help("Project key");
    let name = |id: &'static str, help: &'static str| Arg::new(id).required(true).help(help);

    Command::new("cds-console")
        .version(env!("CARGO_PKG_VERSION"))
        .about("CDS console state session")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Session configuration file (TOML)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print entities as JSON"),
        )
        .subcommand(
            Command::new("project")
                .about("Load a project and every entity its name indexes list")
                .arg(key()),
        )
        .subcommand(
            Command::new("application")
                .about("Fetch one application")
                .arg(key())
                .arg(name("name", "Application name")),
        )
        .subcommand(
            Command::new("rename-application")
                .about("Rename an application and show the updated name index")
                .arg(key())
                .arg(name("from", "Current name"))
                .arg(name("to", "New name")),
        )
        .subcommand(
            Command::new("workflow")
                .about("Fetch one workflow and report its edit overlay")
                .arg(key())
                .arg(name("name", "Workflow name")),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<SessionConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => SessionConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(SessionConfig::default().with_env_overrides()),
    }
}

fn arg<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a str> {
    args.get_one::<String>(id)
        .map(String::as_str)
        .with_context(|| format!("missing argument <{id}>"))
}

fn project_key(args: &ArgMatches) -> Result<ProjectKey> {
    let raw = arg(args, "key")?;
    ProjectKey::new(raw).with_context(|| format!("invalid project key '{raw}'"))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn show_project(session: &Session, key: &ProjectKey, json: bool) -> Result<()> {
    let project = session.switch_project(key, &INDEXES).await?;
    let count = session.hydrate(key).await?;
    if json {
        return print_json(&*project);
    }
    println!("{} ({})", project.name, project.key);
    for kind in [
        EntityKind::Application,
        EntityKind::Pipeline,
        EntityKind::Workflow,
        EntityKind::Environment,
    ] {
        let names: Vec<&str> = project
            .names(kind)
            .map(|list| list.iter().map(|n| n.name.as_str()).collect())
            .unwrap_or_default();
        println!("  {kind}: {}", names.join(", "));
    }
    println!("{count} entities cached");
    Ok(())
}

async fn show_application(session: &Session, key: &ProjectKey, name: &str, json: bool) -> Result<()> {
    session.switch_project(key, &INDEXES).await?;
    let app = session.applications().fetch(key, name).await?;
    if json {
        return print_json(&*app);
    }
    println!("{}/{}", key, app.name);
    if let Some(description) = &app.description {
        println!("  {description}");
    }
    if let Some(repo) = &app.repository_fullname {
        println!("  repository: {repo}");
    }
    Ok(())
}

async fn rename_application(session: &Session, key: &ProjectKey, from: &str, to: &str, json: bool) -> Result<()> {
    session.switch_project(key, &INDEXES).await?;
    session.applications().fetch(key, from).await?;
    session
        .dispatch(ApplicationCommand::Update {
            target: CacheKey::new(key.clone(), from),
            changes: Application::named(to),
        })
        .await
        .with_context(|| format!("renaming application '{from}' to '{to}'"))?;

    let names = session
        .project()
        .and_then(|p| p.application_names.clone())
        .unwrap_or_default();
    if json {
        return print_json(&names);
    }
    for entry in &names {
        println!("{}", entry.name);
    }
    Ok(())
}

async fn show_workflow(session: &Session, key: &ProjectKey, name: &str, json: bool) -> Result<()> {
    session.switch_project(key, &INDEXES).await?;
    let workflow = session.workflows().fetch(key, name).await?;
    let target = CacheKey::new(key.clone(), name);
    let overlays = session.workflows().overlays();

    if json {
        let view = session.workflows().view(key, name);
        return print_json(&view.as_ref().unwrap_or(&*workflow));
    }
    println!("{}/{}", key, workflow.name);
    match overlays.inspect(&target, |draft| draft.node_count()) {
        Some(nodes) => println!(
            "  edit mode: {nodes} nodes, {}",
            if overlays.changed(&target) { "unsaved changes" } else { "clean" }
        ),
        None => println!("  canonical"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));
    let json = matches.get_flag("json");
    let session = Session::from_config(load_config(&matches)?)?;

    let result = match matches.subcommand() {
        Some(("project", args)) => show_project(&session, &project_key(args)?, json).await,
        Some(("application", args)) => {
            show_application(&session, &project_key(args)?, arg(args, "name")?, json).await
        }
        Some(("rename-application", args)) => {
            rename_application(&session, &project_key(args)?, arg(args, "from")?, arg(args, "to")?, json).await
        }
        Some(("workflow", args)) => {
            show_workflow(&session, &project_key(args)?, arg(args, "name")?, json).await
        }
        _ => Ok(()),
    };
    session.teardown();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let matches = cli()
            .try_get_matches_from(["cds-console", "workflow", "test1", "wf", "--json"])
            .unwrap();
        assert!(matches.get_flag("json"));
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "workflow");
        assert_eq!(project_key(args).unwrap().as_str(), "test1");
    }
}
