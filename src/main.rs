use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use scopeforge::config::Config;
use scopeforge::db::{Database, ProjectStore};
use scopeforge::integrity::ProjectSnapshot;
use scopeforge::models::*;
use scopeforge::query::{Filter, PageSize, Query, Queryable, Sort};
use scopeforge::recommend::{
    fetch_recommendations, HttpSuggestionProvider, KnowledgeBase, RecommendationKind,
    RecommendationSource, Selections,
};
use scopeforge::{render, stats};

#[derive(Parser)]
#[command(name = "scopeforge")]
#[command(about = "Scope projects into modules, user stories and features")]
struct Cli {
    /// Project to operate on (see `project list`)
    #[arg(short, long, global = true)]
    project: Option<Uuid>,

    /// SQLite database file (overrides config and SCOPEFORGE_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and list projects
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Manage modules
    #[command(subcommand)]
    Module(ModuleCommand),
    /// Manage user stories
    #[command(subcommand)]
    Story(StoryCommand),
    /// Manage features
    #[command(subcommand)]
    Feature(FeatureCommand),
    /// Show and pick recommended features or business rules for a module
    Recommend {
        module_id: Uuid,
        /// Select every remaining recommendation
        #[arg(long)]
        select_all: bool,
        /// Add a custom entry
        #[arg(long)]
        add: Option<String>,
        /// Work on business rules instead of features
        #[arg(long)]
        rules: bool,
    },
    /// Progress rollups per module
    Stats,
    /// Print the module/story/feature hierarchy
    Tree,
}

#[derive(Subcommand)]
enum ProjectCommand {
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    List,
}

#[derive(Subcommand)]
enum ModuleCommand {
    Add {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long, default_value = "")]
        business_impact: String,
        #[arg(long, default_value = "")]
        dependencies: String,
    },
    List(ListArgs),
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum StoryCommand {
    Add {
        #[arg(long)]
        module: Uuid,
        title: String,
        #[arg(long)]
        role: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "")]
        acceptance_criteria: String,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
    },
    List(ListArgs),
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum FeatureCommand {
    Add {
        #[arg(long)]
        story: Uuid,
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long)]
        hours: Option<f64>,
        #[arg(long)]
        assignee: Option<String>,
    },
    List(ListArgs),
    Delete { id: Uuid },
}

#[derive(Args)]
struct ListArgs {
    /// Case-insensitive text search
    #[arg(long, default_value = "")]
    search: String,
    /// Exact match, `field=value`; `field=all` disables the filter
    #[arg(long)]
    filter: Vec<Filter>,
    /// `field` or `field:desc`
    #[arg(long)]
    sort: Option<Sort>,
    #[arg(long, default_value_t = 1)]
    page: usize,
    /// Rows per page; 0 shows everything
    #[arg(long)]
    page_size: Option<usize>,
}

impl ListArgs {
    fn query(&self, config: &Config) -> Query {
        let size = match self.page_size {
            Some(0) => PageSize::Unbounded,
            Some(n) => PageSize::Limited(n),
            None => config.page_size(),
        };
        let mut query = Query::new().search(&self.search).page(self.page, size);
        query.filters = self.filter.clone();
        query.sort = self.sort.clone();
        query
    }
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::from_str(s).ok_or_else(|| format!("unknown priority '{}'", s))
}

/// Initialize tracing with output to stderr so stdout stays clean for JSON
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "scopeforge=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_page<T: Queryable + Serialize>(items: &[T], args: &ListArgs, config: &Config) -> Result<()> {
    let page = args.query(config).run(items)?;
    eprintln!(
        "{} {}(s) matched, page {} of {}",
        page.total_matches,
        T::KIND,
        args.page,
        page.page_count
    );
    print_json(&page.items)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::load();
    let db = match cli.db.clone().or_else(|| config.database_path.clone()) {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    db.migrate()?;

    match cli.command {
        Commands::Project(cmd) => project_command(&db, cmd)?,
        Commands::Module(cmd) => {
            let (project_id, snapshot) = open_project(&db, cli.project)?;
            module_command(&db, &config, project_id, snapshot, cmd)?;
        }
        Commands::Story(cmd) => {
            let (project_id, snapshot) = open_project(&db, cli.project)?;
            story_command(&db, &config, project_id, snapshot, cmd)?;
        }
        Commands::Feature(cmd) => {
            let (project_id, snapshot) = open_project(&db, cli.project)?;
            feature_command(&db, &config, project_id, snapshot, cmd)?;
        }
        Commands::Recommend {
            module_id,
            select_all,
            add,
            rules,
        } => {
            let (project_id, snapshot) = open_project(&db, cli.project)?;
            let kind = if rules {
                RecommendationKind::BusinessRule
            } else {
                RecommendationKind::Feature
            };
            let request = RecommendRequest {
                module_id,
                kind,
                select_all,
                add,
            };
            recommend(&db, &config, project_id, &snapshot, request).await?;
        }
        Commands::Stats => {
            let (_, snapshot) = open_project(&db, cli.project)?;
            print_json(&stats::project_stats(&snapshot))?;
        }
        Commands::Tree => {
            let (_, snapshot) = open_project(&db, cli.project)?;
            print!("{}", render::render_tree(&snapshot));
        }
    }

    Ok(())
}

fn open_project(db: &Database, project: Option<Uuid>) -> Result<(Uuid, ProjectSnapshot)> {
    let project_id = project
        .context("No project selected; pass --project <id> (see `scopeforge project list`)")?;
    Ok((project_id, db.load(project_id)?))
}

fn project_command(db: &Database, cmd: ProjectCommand) -> Result<()> {
    match cmd {
        ProjectCommand::Create { name, description } => {
            let project = db.create_project(CreateProjectInput { name, description })?;
            print_json(&project)
        }
        ProjectCommand::List => print_json(&db.get_all_projects()?),
    }
}

fn module_command(
    db: &Database,
    config: &Config,
    project_id: Uuid,
    mut snapshot: ProjectSnapshot,
    cmd: ModuleCommand,
) -> Result<()> {
    match cmd {
        ModuleCommand::Add {
            name,
            description,
            priority,
            business_impact,
            dependencies,
        } => {
            let module = snapshot.add_module(CreateModuleInput {
                name,
                description,
                priority: priority.unwrap_or_default(),
                business_impact,
                dependencies,
                ..Default::default()
            })?;
            db.save(project_id, &snapshot)?;
            print_json(&module)
        }
        ModuleCommand::List(args) => print_page(snapshot.modules(), &args, config),
        ModuleCommand::Delete { id } => {
            let report = snapshot.delete_module(id)?;
            db.save(project_id, &snapshot)?;
            prune_selections(db, project_id, &snapshot)?;
            print_json(&report)
        }
    }
}

fn story_command(
    db: &Database,
    config: &Config,
    project_id: Uuid,
    mut snapshot: ProjectSnapshot,
    cmd: StoryCommand,
) -> Result<()> {
    match cmd {
        StoryCommand::Add {
            module,
            title,
            role,
            description,
            acceptance_criteria,
            priority,
        } => {
            let story = snapshot.add_user_story(CreateUserStoryInput {
                module_id: Some(module),
                title,
                user_role: role,
                description,
                acceptance_criteria,
                priority: priority.unwrap_or_default(),
                ..Default::default()
            })?;
            db.save(project_id, &snapshot)?;
            print_json(&story)
        }
        StoryCommand::List(args) => print_page(snapshot.user_stories(), &args, config),
        StoryCommand::Delete { id } => {
            let report = snapshot.delete_user_story(id)?;
            db.save(project_id, &snapshot)?;
            print_json(&report)
        }
    }
}

fn feature_command(
    db: &Database,
    config: &Config,
    project_id: Uuid,
    mut snapshot: ProjectSnapshot,
    cmd: FeatureCommand,
) -> Result<()> {
    match cmd {
        FeatureCommand::Add {
            story,
            title,
            description,
            priority,
            hours,
            assignee,
        } => {
            let feature = snapshot.add_feature(CreateFeatureInput {
                user_story_id: Some(story),
                title,
                description,
                priority: priority.unwrap_or_default(),
                estimated_hours: hours,
                assignee,
                ..Default::default()
            })?;
            db.save(project_id, &snapshot)?;
            print_json(&feature)
        }
        FeatureCommand::List(args) => print_page(snapshot.features(), &args, config),
        FeatureCommand::Delete { id } => {
            let feature = snapshot.delete_feature(id)?;
            db.save(project_id, &snapshot)?;
            print_json(&feature)
        }
    }
}

fn prune_selections(db: &Database, project_id: Uuid, snapshot: &ProjectSnapshot) -> Result<()> {
    let mut selections = db.load_selections(project_id)?;
    if selections.prune(snapshot) > 0 {
        db.save_selections(project_id, &selections)?;
    }
    Ok(())
}

struct RecommendRequest {
    module_id: Uuid,
    kind: RecommendationKind,
    select_all: bool,
    add: Option<String>,
}

async fn recommend(
    db: &Database,
    config: &Config,
    project_id: Uuid,
    snapshot: &ProjectSnapshot,
    request: RecommendRequest,
) -> Result<()> {
    let RecommendRequest {
        module_id,
        kind,
        select_all,
        add,
    } = request;
    let module = snapshot
        .module(module_id)
        .with_context(|| format!("Module not found: {}", module_id))?;

    let mut kb = match &config.knowledge_base_path {
        Some(path) => KnowledgeBase::load(path)?,
        None => KnowledgeBase::builtin().clone(),
    };

    let provider = match &config.suggestion_url {
        Some(url) => Some(HttpSuggestionProvider::new(
            url.clone(),
            Some(config.suggestion_timeout()),
        )?),
        None => None,
    };
    let credential = config.credential();
    let recommended =
        fetch_recommendations(&kb, module, provider.as_ref(), credential.as_ref()).await;
    if let Some(reason) = &recommended.degradation {
        eprintln!("{}", reason);
    }
    if recommended.source == RecommendationSource::Dynamic {
        // Offer the merged lists as this module's candidates for the session.
        kb.insert(module.name.clone(), recommended.recommendations.clone());
    }

    let mut selections: Selections = db.load_selections(project_id)?;
    let mut changed = false;
    if select_all {
        match selections.select_all(&kb, module, kind) {
            Some(notice) => eprintln!("{}", notice),
            None => changed = true,
        }
    }
    if let Some(text) = add {
        match selections.add_custom(module.id, kind, &text) {
            Some(notice) => eprintln!("{}", notice),
            None => changed = true,
        }
    }
    if changed {
        db.save_selections(project_id, &selections)?;
    }

    print_json(&serde_json::json!({
        "module": module.name,
        "kind": kind,
        "source": recommended.source,
        "available": selections.available(&kb, module, kind),
        "selected": selections.get(module.id, kind),
    }))
}
