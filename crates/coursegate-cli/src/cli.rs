use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "coursegate",
    about = "Coursegate: prerequisite-gated access control for courses and lessons",
    version
)]
pub struct Cli {
    /// Path to a coursegate.toml config file
    #[arg(long, global = true, env = "COURSEGATE_CONFIG")]
    pub config: Option<String>,

    /// Path to the catalog JSONL (overrides config)
    #[arg(long, global = true)]
    pub catalog: Option<String>,

    /// Path to the completion log JSONL (overrides config)
    #[arg(long, global = true)]
    pub completions: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty catalog if none exists
    Init {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage courses and lessons
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },

    /// Manage prerequisite edges
    Prereq {
        #[command(subcommand)]
        command: PrereqCommands,
    },

    /// Record and inspect learner completions
    Completion {
        #[command(subcommand)]
        command: CompletionCommands,
    },

    /// Evaluate learner access
    Access {
        #[command(subcommand)]
        command: AccessCommands,
    },

    /// Validate a catalog file (dangling edges, duplicates, cycles)
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ItemKindArg {
    #[value(name = "course")]
    Course,
    #[value(name = "lesson")]
    Lesson,
}

#[derive(Subcommand)]
pub enum ItemCommands {
    /// Register or replace an item
    Add {
        /// Item ID
        id: String,

        /// Display title
        #[arg(long)]
        title: String,

        /// Item kind
        #[arg(long, default_value = "course")]
        kind: ItemKindArg,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change an item's title
    Rename {
        /// Item ID
        id: String,

        /// New title
        #[arg(long)]
        title: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete an item and every prerequisite edge that references it
    Delete {
        /// Item ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered items
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum PrereqCommands {
    /// Require completion of TO before FROM can be accessed
    Add {
        /// Item that gains the requirement
        from: String,

        /// Item that must be completed first
        to: String,

        /// Optional created_by annotation
        #[arg(long, default_value = "")]
        created_by: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a prerequisite edge
    Remove {
        /// Item that has the requirement
        from: String,

        /// Required item
        to: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List direct prerequisites of an item, in insertion order
    List {
        /// Item ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List items that require this item
    Dependents {
        /// Item ID
        id: String,

        /// Include indirect dependents
        #[arg(long)]
        transitive: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum CompletionCommands {
    /// Record that a learner completed an item
    Add {
        /// Learner ID
        learner_id: String,

        /// Completed item ID
        item_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List a learner's completed items
    List {
        /// Learner ID
        learner_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AccessCommands {
    /// Decide whether a learner may access an item
    ///
    /// Exit status: 0 granted, 2 denied, 3 completion source unavailable,
    /// 1 any other error.
    Check {
        /// Learner ID
        learner_id: String,

        /// Target item ID
        item_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
