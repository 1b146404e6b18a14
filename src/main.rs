use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;

use vocabularies_extra::config::SubjectsConfig;
use vocabularies_extra::datastreams::writers::JsonLinesWriter;
use vocabularies_extra::datastreams::{Marc21CollectionReader, MeshReader, YamlReader, process};
use vocabularies_extra::infrastructure::logging::init_logging;
use vocabularies_extra::jobs::{Job, OAI_TIMESTAMP_FORMAT, GND_UPDATE_WINDOW_MINUTES};
use vocabularies_extra::modules::integrations::oai_pmh::OaiHarvester;
use vocabularies_extra::{
    DdcYamlTransformer, GndMarc21Transformer, MeshSubjectXmlTransformer, Result, SubjectError,
};

#[derive(Parser)]
#[command(
    name = "vocabularies-extra",
    version,
    about = "Map DDC, GND and MeSH sources to normalized subject records"
)]
struct Cli {
    /// Write records to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Map a YAML file of DDC rows
    Ddc { file: PathBuf },
    /// Map a MARC21 collection of GND authority records
    Gnd { file: PathBuf },
    /// Map a MeSH descriptor record set
    Mesh { file: PathBuf },
    /// Harvest and map GND updates over OAI-PMH
    HarvestGnd {
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        #[arg(long)]
        until: Option<DateTime<Utc>>,
    },
    /// Print the task arguments of a registered job
    Job {
        id: String,
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() {
    init_logging();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = SubjectsConfig::from_env();

    let cli = Cli::parse();
    if let Err(e) = run(cli, &config).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &SubjectsConfig) -> Result<()> {
    let sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = JsonLinesWriter::new(sink);

    match cli.command {
        Command::Ddc { file } => {
            let rows = YamlReader.read(BufReader::new(File::open(file)?))?;
            process(rows.into_iter().map(Ok), &DdcYamlTransformer::new(config), &mut writer)?;
        }
        Command::Gnd { file } => {
            let records = Marc21CollectionReader.read(BufReader::new(File::open(file)?));
            process(records, &GndMarc21Transformer::new(), &mut writer)?;
        }
        Command::Mesh { file } => {
            let records = MeshReader.read(BufReader::new(File::open(file)?));
            process(records, &MeshSubjectXmlTransformer::new(config), &mut writer)?;
        }
        Command::HarvestGnd { since, until } => {
            let until = until.unwrap_or_else(Utc::now);
            let since =
                since.unwrap_or(until - chrono::Duration::minutes(GND_UPDATE_WINDOW_MINUTES));

            let harvester = OaiHarvester::new(&config.gnd_oai_url)?;
            let records = harvester
                .list_records(
                    &since.format(OAI_TIMESTAMP_FORMAT).to_string(),
                    &until.format(OAI_TIMESTAMP_FORMAT).to_string(),
                )
                .await?;
            process(records.into_iter().map(Ok), &GndMarc21Transformer::new(), &mut writer)?;
        }
        Command::Job { id, since } => {
            let job = Job::from_id(&id)
                .ok_or_else(|| SubjectError::Config(format!("Unknown job '{}'", id)))?;
            let args = job.build_task_arguments(config, since, Utc::now())?;
            let mut sink = writer.finish()?;
            serde_json::to_writer_pretty(&mut sink, &args)?;
            writeln!(sink)?;
            return Ok(());
        }
    }

    writer.finish()?;
    Ok(())
}
