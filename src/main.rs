use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use usercf::algorithms::SimilarityLookup;
use usercf::io::{self, CsvFormat};
use usercf::utils::{metrics, split_holdout, validation};
use usercf::{init_tracing, Config, LazySimilarityMatrix, RatingMatrix, SimilarityKind, SimilarityMatrix, UserBasedPredictor};

#[derive(Parser, Debug)]
#[command(author, version, about = "User-user collaborative filtering", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Ratings CSV
    #[arg(short, long)]
    ratings: PathBuf,

    #[arg(long, value_enum)]
    format: Option<CsvFormat>,

    #[arg(long)]
    delimiter: Option<String>,

    #[arg(long, value_enum)]
    measure: Option<SimilarityKind>,

    /// Print JSON instead of plain text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the pairwise user similarity matrix
    Similarities,
    /// Predict one user's rating of one item
    Predict {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        item: String,
    },
    /// Rank the items a user has not rated yet
    Recommend {
        #[arg(short, long)]
        user: String,
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },
    /// Hold out part of the ratings and score predictions against them
    Evaluate {
        #[arg(long, default_value_t = 0.2)]
        holdout: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };

    if let Some(format) = args.format {
        config.input.format = format;
    }
    if let Some(ref delimiter) = args.delimiter {
        config.input.delimiter = delimiter.clone();
    }
    if let Some(measure) = args.measure {
        config.similarity.measure = measure;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = load_config(&args)?;
    info!("Configuration loaded: {:?}", config);

    let delimiter = validation::validate_delimiter(&config.input.delimiter)?;
    let ratings = io::load_ratings(&args.ratings, config.input.format, delimiter)?;

    match &args.command {
        Command::Similarities => print_similarities(&config, &ratings, args.json, delimiter),
        Command::Predict { user, item } => run_predict(&config, &ratings, user, item, args.json),
        Command::Recommend { user, top_n } => {
            let n = top_n.unwrap_or(config.prediction.top_n);
            run_recommend(&config, &ratings, user, n, args.json)
        }
        Command::Evaluate { holdout, seed } => run_evaluate(&config, &ratings, *holdout, *seed, args.json),
    }
}

fn print_similarities(config: &Config, ratings: &RatingMatrix, json: bool, delimiter: u8) -> Result<()> {
    let similarities = config.similarity.builder().build(ratings);

    if json {
        println!("{}", serde_json::to_string_pretty(&similarities)?);
    } else {
        io::write_similarity_csv(&similarities, std::io::stdout().lock(), delimiter)?;
    }
    Ok(())
}

fn run_predict(config: &Config, ratings: &RatingMatrix, user: &str, item: &str, json: bool) -> Result<()> {
    let eager: SimilarityMatrix;
    let lazy: LazySimilarityMatrix<'_, SimilarityKind>;
    let source: &dyn SimilarityLookup = if config.similarity.lazy {
        lazy = LazySimilarityMatrix::new(ratings, config.similarity.measure);
        &lazy
    } else {
        eager = config.similarity.builder().build(ratings);
        &eager
    };

    let predictor = UserBasedPredictor::new(ratings, source);
    let mut prediction = predictor
        .predict(user, item)
        .with_context(|| format!("Cannot predict {}'s rating of {}", user, item))?;
    prediction.rating = config.prediction.adjust(prediction.rating);

    if json {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
    } else {
        println!(
            "{} / {}: {:.4} ({} neighbors, weight {:.4})",
            prediction.user, prediction.item, prediction.rating, prediction.neighbors, prediction.weight
        );
    }
    Ok(())
}

fn run_recommend(config: &Config, ratings: &RatingMatrix, user: &str, n: usize, json: bool) -> Result<()> {
    let similarities = config.similarity.builder().build(ratings);
    let predictor = UserBasedPredictor::new(ratings, &similarities);

    let mut response = predictor
        .recommend(user, n)
        .with_context(|| format!("Cannot recommend for {}", user))?;
    for rec in &mut response.recommendations {
        rec.predicted_rating = config.prediction.adjust(rec.predicted_rating);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        for (rank, rec) in response.recommendations.iter().enumerate() {
            println!("{:>3}. {} {:.4} ({} neighbors)", rank + 1, rec.item_id, rec.predicted_rating, rec.neighbors);
        }
        println!("{} unrated items had no usable neighbors", response.skipped);
    }
    Ok(())
}

fn run_evaluate(config: &Config, ratings: &RatingMatrix, holdout: f64, seed: u64, json: bool) -> Result<()> {
    validation::validate_holdout_fraction(holdout)?;

    let (train, test) = split_holdout(ratings, holdout, seed);
    info!(train = train.num_ratings(), test = test.len(), "Hold-out split");

    let similarities = config.similarity.builder().build(&train);
    let predictor = UserBasedPredictor::new(&train, &similarities);
    let report = metrics::evaluate(&predictor, &test, |r| config.prediction.adjust(r));

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("predicted:    {}", report.predicted);
        println!("no neighbors: {}", report.no_neighbors);
        println!("no signal:    {}", report.no_signal);
        println!("unknown user: {}", report.unknown_user);
        println!("coverage:     {:.4}", report.coverage);
        println!("MAE:          {:.4}", report.mae);
        println!("RMSE:         {:.4}", report.rmse);
    }
    Ok(())
}
