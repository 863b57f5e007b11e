//! Hearthwood CLI - the storefront screens as commands.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog and fill the cart
//! hw products list --search oak
//! hw cart add 12 --quantity 2
//! hw cart show
//!
//! # Check out as a guest (creates the account along with the order)
//! hw cart checkout -u willow -p secret1 --full-name "Willow Reed" \
//!     --email willow@example.com --phone 555-0111 --address "9 Cedar Ct"
//!
//! # Look up a guest order
//! hw track 31 --email willow@example.com
//!
//! # Review a product (logged in)
//! hw reviews add 12 --rating 5 --text "Sturdy and handsome"
//! ```
//!
//! All state (cart, checkout snapshot, session token) lives in the file named
//! by `HEARTHWOOD_STORAGE_PATH`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use hearthwood_core::{OrderId, ProductId, ReviewId};
use hearthwood_storefront::forms::{PasswordChangeForm, ProfileForm, ReviewForm};
use hearthwood_storefront::{AppError, Redirect, Storefront, StorefrontConfig};
use rust_decimal::Decimal;
use secrecy::SecretString;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::checkout::CheckoutArgs;

/// Log filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "hearthwood_storefront=info,hearthwood_cli=info";

#[derive(Parser)]
#[command(name = "hw")]
#[command(author, version, about = "Hearthwood storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// View and change the guest cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order from the current checkout snapshot
    Checkout(CheckoutArgs),
    /// Order history for the logged-in user
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Look up a guest order by id and email
    Track {
        /// Order number
        order_id: String,

        /// Email used at checkout
        #[arg(short, long)]
        email: String,
    },
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Log in and store the session token
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },
    /// Create an account and log in
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,

        #[arg(short, long)]
        email: String,

        #[arg(long)]
        full_name: String,

        #[arg(long)]
        phone: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Product reviews
    Reviews {
        #[command(subcommand)]
        action: ReviewsAction,
    },
    /// View and edit your account
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ReviewsAction {
    /// List a product's reviews
    List { product_id: ProductId },
    /// Review a product
    Add {
        product_id: ProductId,

        /// Stars, 1 to 5
        #[arg(short, long)]
        rating: u8,

        #[arg(short, long, default_value = "")]
        text: String,
    },
    /// Change one of your reviews
    Update {
        product_id: ProductId,
        review_id: ReviewId,

        #[arg(short, long)]
        rating: u8,

        #[arg(short, long, default_value = "")]
        text: String,
    },
    /// Delete one of your reviews
    Delete {
        product_id: ProductId,
        review_id: ReviewId,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show your profile
    Show,
    /// Change your name, email or phone
    Update {
        #[arg(long)]
        full_name: String,

        #[arg(short, long)]
        email: String,

        #[arg(long, default_value = "")]
        phone: String,
    },
    /// Change your password
    Password {
        #[arg(long)]
        current: String,

        #[arg(long)]
        new: String,

        #[arg(long)]
        confirm: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart with current product details
    Show,
    /// Add a product
    Add {
        product_id: ProductId,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 removes it)
    Update { product_id: ProductId, quantity: i64 },
    /// Remove a line
    Remove { product_id: ProductId },
    /// Empty the cart
    Clear,
    /// Snapshot the cart and check out in one step
    Checkout(CheckoutArgs),
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List your orders
    List,
    /// Show one order
    Show { order_id: OrderId },
    /// Cancel a pending order
    Cancel { order_id: OrderId },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products
    List {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        category: Option<i64>,

        #[arg(long)]
        min_price: Option<Decimal>,

        #[arg(long)]
        max_price: Option<Decimal>,

        /// Sort order, e.g. `price_asc` or `newest`
        #[arg(long)]
        sort: Option<String>,

        #[arg(long)]
        page: Option<u32>,
    },
    /// Show one product
    Show { product_id: ProductId },
    /// List categories
    Categories,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => exit_with(&AppError::from(e)),
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        e.report();
        exit_with(&e);
    }
}

#[allow(clippy::print_stderr)]
fn exit_with(error: &AppError) -> ! {
    eprintln!("Error: {}", error.user_message());
    match error.redirect() {
        Some(Redirect::Login) => eprintln!("Log in with `hw login` and try again."),
        Some(other) => eprintln!("Continue at {other}"),
        None => {}
    }
    std::process::exit(1);
}

async fn run(cli: Cli, config: StorefrontConfig) -> hearthwood_storefront::Result<()> {
    let app = Storefront::open(config)?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&app).await?,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&app, product_id, quantity).await?,
            CartAction::Update {
                product_id,
                quantity,
            } => commands::cart::update(&app, &product_id, quantity)?,
            CartAction::Remove { product_id } => commands::cart::remove(&app, &product_id)?,
            CartAction::Clear => commands::cart::clear(&app)?,
            CartAction::Checkout(args) => {
                commands::cart::proceed(&app).await?;
                commands::checkout::run(&app, args).await?;
            }
        },
        Commands::Checkout(args) => commands::checkout::run(&app, args).await?,
        Commands::Orders { action } => match action {
            OrdersAction::List => commands::orders::list(&app).await?,
            OrdersAction::Show { order_id } => commands::orders::show(&app, order_id).await?,
            OrdersAction::Cancel { order_id } => commands::orders::cancel(&app, order_id).await?,
        },
        Commands::Track { order_id, email } => {
            commands::orders::track(&app, order_id, email).await?;
        }
        Commands::Products { action } => match action {
            ProductsAction::List {
                search,
                category,
                min_price,
                max_price,
                sort,
                page,
            } => {
                let query = hearthwood_storefront::api::ProductQuery {
                    search,
                    category_id: category.map(hearthwood_core::CategoryId::new),
                    min_price,
                    max_price,
                    sort,
                    page,
                    limit: None,
                };
                commands::products::list(&app, &query).await?;
            }
            ProductsAction::Show { product_id } => {
                commands::products::show(&app, &product_id).await?;
            }
            ProductsAction::Categories => commands::products::categories(&app).await?,
        },
        Commands::Login { username, password } => {
            commands::account::login(&app, username, password).await?;
        }
        Commands::Register {
            username,
            password,
            email,
            full_name,
            phone,
        } => {
            commands::account::register(&app, username, password, email, full_name, phone).await?;
        }
        Commands::Logout => commands::account::logout(&app)?,
        Commands::Reviews { action } => match action {
            ReviewsAction::List { product_id } => commands::reviews::list(&app, &product_id).await?,
            ReviewsAction::Add {
                product_id,
                rating,
                text,
            } => {
                let form = ReviewForm {
                    rating,
                    review_text: text,
                };
                commands::reviews::add(&app, &product_id, &form).await?;
            }
            ReviewsAction::Update {
                product_id,
                review_id,
                rating,
                text,
            } => {
                let form = ReviewForm {
                    rating,
                    review_text: text,
                };
                commands::reviews::update(&app, &product_id, review_id, &form).await?;
            }
            ReviewsAction::Delete {
                product_id,
                review_id,
            } => commands::reviews::delete(&app, &product_id, review_id).await?,
        },
        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::account::show_profile(&app).await?,
            ProfileAction::Update {
                full_name,
                email,
                phone,
            } => {
                let form = ProfileForm {
                    full_name,
                    email,
                    phone,
                };
                commands::account::update_profile(&app, &form).await?;
            }
            ProfileAction::Password {
                current,
                new,
                confirm,
            } => {
                let form = PasswordChangeForm {
                    current_password: SecretString::from(current),
                    new_password: SecretString::from(new),
                    confirm_password: SecretString::from(confirm),
                };
                commands::account::change_password(&app, &form).await?;
            }
        },
    }
    Ok(())
}
