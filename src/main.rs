//! snykctl CLI - manage Snyk organizations, projects, members and issue reports.

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use snykctl::config::{Config, default_config_path};
use snykctl::ignores::{format_ignores, get_project_ignores};
use snykctl::issues::{format_issue_count, format_project_issues};
use snykctl::logging::init_tracing;
use snykctl::{
    AttributeSelection, HttpTransport, IssueQuery, ListMode, OrgRegistry, OutputFormat,
    ProjectRegistry, ReportAggregator, UserRegistry, check_issue_type, orgs,
    parse_tags, projects, users,
};
use std::collections::BTreeMap;
use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "snykctl")]
#[command(about = "Command-line client for Snyk organizations, projects, members and issues")]
#[command(version)]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Log requests and responses to stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file (defaults to ~/.snykctl.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ListFlags {
    /// Print only ids
    #[arg(short, long)]
    quiet: bool,

    /// Print only names
    #[arg(short, long)]
    names: bool,
}

#[derive(Args)]
struct AttributeArgs {
    /// Environment [frontend | backend | internal | external | mobile | saas | on-prem | hosted | distributed]
    #[arg(long)]
    env: Option<String>,

    /// Lifecycle [production | development | sandbox]
    #[arg(long)]
    lifecycle: Option<String>,

    /// Criticality [critical | high | medium | low]
    #[arg(long)]
    criticality: Option<String>,
}

impl AttributeArgs {
    fn selection(&self) -> AttributeSelection {
        AttributeSelection::new(
            self.env.clone(),
            self.lifecycle.clone(),
            self.criticality.clone(),
        )
    }
}

#[derive(Args)]
struct FilterArgs {
    #[command(flatten)]
    attributes: AttributeArgs,

    /// Filter by tag (key=value), repeatable or comma-separated
    #[arg(long, value_delimiter = ',')]
    tag: Vec<String>,
}

impl FilterArgs {
    /// Validate every predicate before anything is sent.
    fn parse(&self) -> Result<(AttributeSelection, BTreeMap<String, String>), Box<dyn Error>> {
        let selection = self.attributes.selection();
        selection.validate()?;
        let tags = parse_tags(&self.tag)?;
        Ok((selection, tags))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Set the API token, group id, timeout and worker size
    Configure,

    /// List organizations
    #[command(alias = "getOrgs")]
    GetOrgs {
        #[command(flatten)]
        list: ListFlags,

        /// Print the API response as-is
        #[arg(short, long)]
        raw: bool,
    },

    /// Find organizations whose name contains a term
    #[command(alias = "searchOrg")]
    SearchOrg {
        term: String,

        #[command(flatten)]
        list: ListFlags,
    },

    /// Print an organization's name
    #[command(alias = "getOrgName")]
    GetOrgName { org_id: String },

    /// Print an organization's settings
    #[command(alias = "getOrgSettings")]
    GetOrgSettings { org_id: String },

    /// Create an organization in the configured group
    #[command(alias = "createOrg")]
    CreateOrg { name: String },

    /// Delete an organization
    #[command(alias = "deleteOrg")]
    DeleteOrg { org_id: String },

    /// List an organization's projects, optionally filtered
    #[command(alias = "getProjects")]
    GetProjects {
        org_id: String,

        #[command(flatten)]
        list: ListFlags,

        /// Also print attributes and tags
        #[arg(short, long)]
        verbose: bool,

        /// Print the API response as-is
        #[arg(short, long)]
        raw: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Print one project's full JSON
    #[command(alias = "getProject")]
    GetProject { org_id: String, project_id: String },

    /// Add a key=value tag to a project
    #[command(alias = "addTag")]
    AddTag {
        org_id: String,
        project_id: String,
        tag: String,
    },

    /// Set a project's environment, lifecycle or criticality
    #[command(alias = "addAttributes")]
    AddAttributes {
        org_id: String,
        project_id: String,

        #[command(flatten)]
        attributes: AttributeArgs,
    },

    /// Delete a project
    #[command(alias = "deleteProject")]
    DeleteProject { org_id: String, project_id: String },

    /// Delete every project of an organization, optionally filtered
    #[command(alias = "deleteAllProjects")]
    DeleteAllProjects {
        org_id: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List aggregated issues of one project, or of every project in an org
    #[command(alias = "getIssues")]
    GetIssues {
        org_id: String,
        project_id: Option<String>,

        /// Issue type [license | vuln]
        #[arg(short = 't', long = "type", default_value = "")]
        issue_type: String,
    },

    /// List ignored issues of one project, or of every project in an org
    #[command(alias = "getIgnores")]
    GetIgnores {
        org_id: String,
        project_id: Option<String>,
    },

    /// Sum the latest issue counts of an organization by severity
    #[command(alias = "countIssues")]
    CountIssues {
        org_id: String,

        /// Output format [text | csv | html]
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// List an organization's members
    #[command(alias = "getUsers")]
    GetUsers {
        org_id: String,

        #[command(flatten)]
        list: ListFlags,

        /// Print the API response as-is
        #[arg(short, long)]
        raw: bool,
    },

    /// List the members of a group (defaults to the configured group)
    #[command(alias = "getGroupUsers")]
    GetGroupUsers {
        group_id: Option<String>,

        #[command(flatten)]
        list: ListFlags,

        /// Print the API response as-is
        #[arg(short, long)]
        raw: bool,
    },

    /// Add a group member to an organization
    #[command(alias = "addUser")]
    AddUser {
        org_id: String,
        user_id: String,

        /// Role in the organization
        #[arg(long, default_value = users::COPY_ROLE)]
        role: String,
    },

    /// Remove a member from an organization
    #[command(alias = "deleteUser")]
    DeleteUser { org_id: String, user_id: String },

    /// Add every member of one organization to another as collaborators
    #[command(alias = "copyUsers")]
    CopyUsers { from_org: String, to_org: String },

    /// Show the members of two organizations side by side
    #[command(alias = "compareUsers")]
    CompareUsers { org1: String, org2: String },

    /// Report every issue of an organization with its introducing dependency
    Report {
        org_id: String,

        /// Issue type [license | vuln]
        #[arg(short = 't', long = "type", default_value = "")]
        issue_type: String,

        /// Output format [text | csv | html]
        #[arg(short, long, default_value = "text")]
        output: String,
    },
}

fn config_path(cli_path: Option<PathBuf>) -> Result<PathBuf, Box<dyn Error>> {
    match cli_path {
        Some(path) => Ok(path),
        None => Ok(default_config_path()?),
    }
}

fn configure(mut config: Config, path: &Path) -> CliResult {
    let stdin = io::stdin();
    config.prompt_update(&mut stdin.lock(), &mut io::stdout())?;
    config.save(path)?;
    println!("{}", format!("Saved {}", path.display()).green());
    Ok(())
}

async fn run(cli: Cli) -> CliResult {
    let path = config_path(cli.config)?;
    let config = Config::load(&path)?;
    let transport = HttpTransport::new(&config)?;

    match cli.command {
        Commands::Configure => configure(config, &path)?,

        Commands::GetOrgs { list, raw } => {
            let mut registry = OrgRegistry::new(&transport);
            if raw {
                println!("{}", registry.fetch_raw().await?);
            } else {
                let mode = ListMode::from_flags(list.quiet, list.names, false);
                print!("{}", orgs::render(registry.fetch().await?, mode));
            }
        }

        Commands::SearchOrg { term, list } => {
            let found = OrgRegistry::new(&transport).search(&term).await?;
            let mode = ListMode::from_flags(list.quiet, list.names, false);
            print!("{}", orgs::render(&found, mode));
        }

        Commands::GetOrgName { org_id } => {
            println!("{}", OrgRegistry::new(&transport).resolve_name(&org_id).await?);
        }

        Commands::GetOrgSettings { org_id } => {
            println!("{}", OrgRegistry::new(&transport).settings_raw(&org_id).await?);
        }

        Commands::CreateOrg { name } => {
            OrgRegistry::new(&transport).create(&name, &config.id).await?;
            println!("OK");
        }

        Commands::DeleteOrg { org_id } => {
            OrgRegistry::new(&transport).delete(&org_id).await?;
            println!("OK");
        }

        Commands::GetProjects {
            org_id,
            list,
            verbose,
            raw,
            filter,
        } => {
            let (selection, tags) = filter.parse()?;
            let mut registry = ProjectRegistry::new(&transport, &org_id);
            if raw {
                println!("{}", registry.fetch_filtered_raw(&selection, &tags).await?);
            } else {
                let mode = ListMode::from_flags(list.quiet, list.names, verbose);
                let found = registry.fetch_filtered(&selection, &tags).await?;
                print!("{}", projects::render(found, mode));
            }
        }

        Commands::GetProject { org_id, project_id } => {
            let registry = ProjectRegistry::new(&transport, &org_id);
            println!("{}", registry.get_project_raw(&project_id).await?);
        }

        Commands::AddTag {
            org_id,
            project_id,
            tag,
        } => {
            ProjectRegistry::new(&transport, &org_id)
                .add_tag(&project_id, &tag)
                .await?;
            println!("OK");
        }

        Commands::AddAttributes {
            org_id,
            project_id,
            attributes,
        } => {
            ProjectRegistry::new(&transport, &org_id)
                .add_attributes(&project_id, &attributes.selection())
                .await?;
            println!("OK");
        }

        Commands::DeleteProject { org_id, project_id } => {
            ProjectRegistry::new(&transport, &org_id)
                .delete_project(&project_id)
                .await?;
            println!("{:<38}DELETED", project_id);
        }

        Commands::DeleteAllProjects { org_id, filter } => {
            let (selection, tags) = filter.parse()?;
            let mut registry = ProjectRegistry::new(&transport, &org_id);
            registry.fetch_filtered(&selection, &tags).await?;
            print!("{}", registry.delete_all().await?);
        }

        Commands::GetIssues {
            org_id,
            project_id,
            issue_type,
        } => {
            check_issue_type(&issue_type)?;
            let query = IssueQuery::new(&transport);
            match project_id {
                Some(project_id) => {
                    let result = query.get_issues(&org_id, &project_id, &issue_type).await?;
                    print!("{}", format_project_issues(&result.issues, None));
                }
                None => {
                    let mut registry = ProjectRegistry::new(&transport, &org_id);
                    let mut out = String::new();
                    for project in registry.fetch().await? {
                        let result = query.get_issues(&org_id, &project.id, &issue_type).await?;
                        out.push_str(&format_project_issues(&result.issues, Some(project.id.as_str())));
                    }
                    print!("{}", out);
                }
            }
        }

        Commands::GetIgnores { org_id, project_id } => match project_id {
            Some(project_id) => {
                let ignores = get_project_ignores(&transport, &org_id, &project_id).await?;
                print!("{}", format_ignores(&ignores, None));
            }
            None => {
                let mut registry = ProjectRegistry::new(&transport, &org_id);
                let mut out = String::new();
                for project in registry.fetch().await? {
                    let ignores = get_project_ignores(&transport, &org_id, &project.id).await?;
                    out.push_str(&format_ignores(&ignores, Some(project.id.as_str())));
                }
                print!("{}", out);
            }
        },

        Commands::CountIssues { org_id, output } => {
            let format: OutputFormat = output.parse()?;
            let results = IssueQuery::new(&transport).get_issue_count(&org_id).await?;
            println!("{}", format_issue_count(&results, format)?.trim_end());
        }

        Commands::GetUsers { org_id, list, raw } => {
            let registry = UserRegistry::new(&transport, &config.id);
            if raw {
                println!("{}", registry.fetch_raw(&org_id).await?);
            } else {
                let mode = ListMode::from_flags(list.quiet, list.names, false);
                print!("{}", users::render(&registry.fetch(&org_id).await?, mode));
            }
        }

        Commands::GetGroupUsers {
            group_id,
            list,
            raw,
        } => {
            let group_id = group_id.unwrap_or_else(|| config.id.clone());
            let registry = UserRegistry::new(&transport, &config.id);
            if raw {
                println!("{}", registry.fetch_group_raw(&group_id).await?);
            } else {
                let mode = ListMode::from_flags(list.quiet, list.names, false);
                print!("{}", users::render(&registry.fetch_group(&group_id).await?, mode));
            }
        }

        Commands::AddUser {
            org_id,
            user_id,
            role,
        } => {
            UserRegistry::new(&transport, &config.id)
                .add_user(&org_id, &user_id, &role)
                .await?;
            println!("OK");
        }

        Commands::DeleteUser { org_id, user_id } => {
            UserRegistry::new(&transport, &config.id)
                .delete_user(&org_id, &user_id)
                .await?;
            println!("OK");
        }

        Commands::CopyUsers { from_org, to_org } => {
            UserRegistry::new(&transport, &config.id)
                .copy_users(&from_org, &to_org)
                .await?;
            println!("OK");
        }

        Commands::CompareUsers { org1, org2 } => {
            let out = UserRegistry::new(&transport, &config.id)
                .compare_users(&org1, &org2)
                .await?;
            print!("{}", out);
        }

        Commands::Report {
            org_id,
            issue_type,
            output,
        } => {
            let format: OutputFormat = output.parse()?;
            check_issue_type(&issue_type)?;
            let mut report = ReportAggregator::new(&transport, &org_id).await?;
            report.load_issues(&issue_type, config.worker_size).await?;
            print!("{}", report.render(format)?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(e) = run(cli).await {
        eprintln!("{}", format!("Error: {}", e).red());
        process::exit(1);
    }
}
