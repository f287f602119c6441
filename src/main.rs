use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use movie_scout::{ClientConfig, Filters, KeywordQuery, ListedMovie, MovieScout, StoreEvent};
use std::process;
use tracing_subscriber::EnvFilter;

/// Browse, filter, search and favorite movies from the command line
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Language for titles, details and genre names
    #[arg(long, global = true, env = "MOVIE_SCOUT_LANGUAGE")]
    language: Option<String>,

    /// Print every store event while commands run
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Discover movies matching filters
    Discover {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value = "popularity.desc")]
        sort_by: String,
        /// Comma separated genre ids
        #[arg(long)]
        genres: Option<String>,
        /// Comma separated keyword ids
        #[arg(long)]
        keywords: Option<String>,
        #[arg(long)]
        include_adult: bool,
        #[arg(long)]
        include_video: bool,
    },
    /// Search movies by title
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        include_adult: bool,
    },
    /// Show the details of one movie
    Movie { id: String },
    /// List movies similar to one movie
    Similar {
        id: String,
        #[arg(long)]
        page: Option<u32>,
    },
    /// List the movie genres
    Genres,
    /// List the supported languages
    Languages,
    /// Search keywords usable with `discover --keywords`
    Keywords {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Add a movie to or remove it from the favorites
    Favorite {
        id: u64,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

/// Prints store events as they happen
fn handle_store_event(event: &StoreEvent) {
    match event {
        StoreEvent::LoadingChanged { store, loading } => {
            let state = if *loading { "loading" } else { "idle" };
            eprintln!("[{}] {}", store, state);
        }
        StoreEvent::Updated { store } => eprintln!("[{}] updated", store),
        StoreEvent::FavoriteChanged {
            movie_id,
            is_favorite,
        } => eprintln!("[favorites] {} -> {}", movie_id, is_favorite),
        StoreEvent::ErrorRaised(error) => {
            eprintln!("[error] {} ({})", error.message, error.status_code)
        }
        StoreEvent::ErrorCleared => eprintln!("[error] cleared"),
    }
}

fn print_movies(movies: &[ListedMovie], current_page: Option<u32>, total_pages: Option<u32>) {
    if movies.is_empty() {
        println!("No movies found.");
        return;
    }

    for entry in movies {
        let star = if entry.is_favorite { "*" } else { " " };
        let year = entry
            .movie
            .release_date
            .as_deref()
            .and_then(|date| date.get(..4))
            .unwrap_or("----");
        println!(
            "{} {:>8}  {}  {} ({:.1})",
            star, entry.movie.id, year, entry.movie.title, entry.movie.vote_average
        );
    }

    if let (Some(page), Some(total)) = (current_page, total_pages) {
        println!("\nPage {} of {}", page, total);
    }
}

fn print_movie_list(scout: &MovieScout) {
    let list = scout.movies().list();
    print_movies(&list.movies, list.current_page, list.total_pages);
}

async fn run(scout: &MovieScout, command: Command, language: &str) {
    match command {
        Command::Discover {
            page,
            sort_by,
            genres,
            keywords,
            include_adult,
            include_video,
        } => {
            let filters = Filters {
                page,
                include_adult,
                include_video,
                language: language.to_string(),
                sort_by,
                with_keywords: keywords,
                with_genres: genres,
            };
            scout.movies().load(filters).await;
            print_movie_list(scout);
        }
        Command::Search {
            query,
            page,
            include_adult,
        } => {
            scout.movies().set_filters(Filters {
                page,
                include_adult,
                language: language.to_string(),
                ..Filters::default()
            });
            scout.movies().search(&query).await;
            print_movie_list(scout);
        }
        Command::Movie { id } => {
            scout.movie().load(Some(&id)).await;
            if let Some(movie) = scout.movie().movie() {
                let released = movie.release_date.as_deref().unwrap_or("unreleased");
                println!("{} ({})", movie.title, released);
                if let Some(tagline) = movie.tagline.as_deref().filter(|t| !t.is_empty()) {
                    println!("{}", tagline);
                }
                let genres: Vec<&str> = movie.genres.iter().map(|g| g.name.as_str()).collect();
                println!("Genres: {}", genres.join(", "));
                if let Some(runtime) = movie.runtime {
                    println!("Runtime: {} min", runtime);
                }
                println!("Rating: {:.1} ({} votes)", movie.vote_average, movie.vote_count);
                println!("\n{}", movie.overview);
            }
        }
        Command::Similar { id, page } => {
            scout.movies().load_similar(Some(&id), page).await;
            print_movie_list(scout);
        }
        Command::Genres => {
            scout.movies().set_filters(Filters {
                language: language.to_string(),
                ..Filters::default()
            });
            scout.load_genres().await;
            for genre in scout.genres().genres() {
                println!("{:>6}  {}", genre.id, genre.name);
            }
        }
        Command::Languages => {
            scout.languages().load().await;
            for language in scout.languages().languages() {
                println!("{}  {}", language.iso_639_1, language.english_name);
            }
        }
        Command::Keywords { query, page } => {
            scout.keywords().search(KeywordQuery { query, page }).await;
            if let Some(keywords) = scout.keywords().keywords() {
                for keyword in &keywords.results {
                    println!("{:>8}  {}", keyword.id, keyword.name);
                }
                println!("\nPage {} of {}", keywords.page, keywords.total_pages);
            }
        }
        Command::Favorite { id, yes } => {
            if let Err(e) = scout.favorites().refresh().await {
                scout.errors().set_error(e, None);
                return;
            }

            let prompt = if scout.favorites().contains(id) {
                format!("Remove movie {} from favorites?", id)
            } else {
                format!("Add movie {} to favorites?", id)
            };
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt(prompt)
                    .default(true)
                    .interact()
                    .unwrap_or(false);
                if !confirmed {
                    println!("Nothing changed.");
                    return;
                }
            }

            scout.movies().toggle_favorite(id).await;
            if scout.errors().active_error().is_none() {
                let state = if scout.favorites().contains(id) {
                    "is now a favorite"
                } else {
                    "is no longer a favorite"
                };
                println!("Movie {} {}.", id, state);
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    if let Some(language) = cli.language {
        config.language = language;
    }

    let scout = match MovieScout::from_config(&config) {
        Ok(scout) => scout,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if cli.verbose {
        scout.subscribe(handle_store_event);
    }

    run(&scout, cli.command, &config.language).await;

    if let Some(error) = scout.errors().active_error() {
        eprintln!("Error ({}): {}", error.status_code, error.message);
        process::exit(1);
    }
}
