//! Product catalog dashboard.
//!
//! Command-line front-end over the catalog client: session management,
//! product CRUD with search and pagination, and the metrics summary.

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_client::config::Config;
use catalog_client::models::{
    CreateProductInput, LoginInput, Phone, Product, ProductMetrics, RegisterInput,
    Thumbnail, UpdateProductInput,
};
use catalog_client::view::{AuthGuard, EditOutcome, ProductsView};
use catalog_client::AppContext;

#[derive(Debug, Parser)]
#[command(name = "catalog", version, about = "Product catalog dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and store the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Register(RegisterArgs),
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    #[command(flatten)]
    Products(ProductCommand),
    /// Print the sales dashboard
    Metrics,
}

/// Commands that need a logged-in session.
#[derive(Debug, Subcommand)]
enum ProductCommand {
    /// List products
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
        /// Substring to match in titles
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show one product
    Show { id: String },
    /// Create a product; the thumbnail is a file path or an http(s) URL
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        thumbnail: String,
    },
    /// Edit a product's metadata and, optionally, its thumbnail
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// true for active, false for inactive
        #[arg(long)]
        active: Option<bool>,
        #[arg(long)]
        thumbnail: Option<String>,
    },
    /// Delete a product
    Delete { id: String },
}

#[derive(Debug, Args)]
struct RegisterArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    verify_password: String,
    #[arg(long)]
    phone_country: Option<String>,
    #[arg(long)]
    phone_ddd: Option<String>,
    #[arg(long)]
    phone_number: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::debug!("API base URL: {}", config.api_base_url);
    tracing::debug!("Auth storage: {:?}", config.auth_storage_path);

    let context = match AppContext::new(config) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("Failed to initialize client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&context, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

async fn run(context: &AppContext, command: Command) -> Result<(), String> {
    let auth = context.auth_view();

    match command {
        Command::Login { email, password } => {
            auth.login(&LoginInput { email, password })
                .await
                .into_result()?;
            match auth.user() {
                Some(user) => println!("Logged in as {} <{}>", user.name, user.email),
                None => println!("Logged in"),
            }
            Ok(())
        }
        Command::Register(args) => {
            let phone = Phone {
                country: args.phone_country,
                ddd: args.phone_ddd,
                number: args.phone_number,
            };
            let input = RegisterInput {
                name: args.name,
                email: args.email,
                password: args.password,
                verify_password: args.verify_password,
                phone: Some(phone),
            };
            auth.register(&input).await.into_result()?;
            if auth.is_authenticated() {
                println!("Account created, logged in");
            } else {
                println!("Account created, run `catalog login` to sign in");
            }
            Ok(())
        }
        Command::Logout => {
            auth.logout().into_result()?;
            println!("Logged out");
            Ok(())
        }
        Command::Whoami => {
            match (auth.is_authenticated(), auth.user()) {
                (true, Some(user)) => println!("{} <{}> ({})", user.name, user.email, user.platform_role),
                (true, None) => println!("Logged in"),
                (false, _) => println!("Not logged in"),
            }
            Ok(())
        }
        Command::Metrics => {
            print_metrics(&ProductMetrics::mock());
            Ok(())
        }
        Command::Products(command) => {
            if let AuthGuard::Redirect(route) = auth.guard() {
                return Err(format!(
                    "Not logged in (would redirect to {}); run `catalog login` first",
                    route
                ));
            }
            run_products(context, command).await
        }
    }
}

async fn run_products(context: &AppContext, command: ProductCommand) -> Result<(), String> {
    let view = context.products_view();

    match command {
        ProductCommand::List {
            page,
            page_size,
            filter,
        } => {
            let mut filters = context.products.filters();
            if let Some(page_size) = page_size {
                filters.page_size = page_size;
            }
            if let Some(filter) = filter {
                filters.filter = filter;
            }
            if let Some(page) = page {
                filters.page = page;
            }
            filters.validate().map_err(|e| e.user_message())?;
            view.mount(Some(filters)).await;
            if let Some(error) = view.state().error {
                return Err(error);
            }
            print_page(&view);
            Ok(())
        }
        ProductCommand::Show { id } => {
            let product = context
                .products
                .fetch_product(&id)
                .await
                .map_err(|e| e.user_message())?;
            print_product(&product);
            Ok(())
        }
        ProductCommand::Create {
            title,
            description,
            thumbnail,
        } => {
            let thumbnail = Thumbnail::from_arg(&thumbnail).map_err(|e| e.user_message())?;
            let product = view
                .create(CreateProductInput {
                    title,
                    description,
                    thumbnail,
                })
                .await
                .into_result()?;
            context.products.settle().await;
            println!("Created {}", product.id);
            print_product(&product);
            Ok(())
        }
        ProductCommand::Edit {
            id,
            title,
            description,
            active,
            thumbnail,
        } => {
            let current = context
                .products
                .fetch_product(&id)
                .await
                .map_err(|e| e.user_message())?;
            let mut input = UpdateProductInput::from(&current);
            if let Some(title) = title {
                input.title = title;
            }
            if let Some(description) = description {
                input.description = description;
            }
            if let Some(active) = active {
                input.status = active;
            }
            let thumbnail = thumbnail
                .as_deref()
                .map(Thumbnail::from_arg)
                .transpose()
                .map_err(|e| e.user_message())?;

            match view.edit(&id, &input, thumbnail).await {
                EditOutcome::Updated(product) => {
                    println!("Updated {}", product.id);
                    print_product(&product);
                    Ok(())
                }
                EditOutcome::ThumbnailFailed { product, error } => {
                    print_product(&product);
                    Err(format!("Product saved, but the image was not updated: {}", error))
                }
                EditOutcome::MetadataFailed { error } => Err(error),
            }
        }
        ProductCommand::Delete { id } => {
            view.remove(&id).await.into_result()?;
            context.products.settle().await;
            println!("Deleted {}", id);
            Ok(())
        }
    }
}

fn print_page(view: &ProductsView) {
    let state = view.state();
    if !view.has_products() {
        println!("No products found");
        return;
    }
    for product in &state.products {
        println!(
            "{:<26} {:<8} {}",
            product.id,
            if product.status { "active" } else { "inactive" },
            product.title
        );
    }
    let total = state.meta.map(|m| m.total).unwrap_or(0);
    println!(
        "page {}/{} ({} total){}{}",
        view.current_page(),
        view.total_pages().max(1),
        total,
        if view.is_first_page() { "" } else { "  [prev]" },
        if view.is_last_page() { "" } else { "  [next]" },
    );
}

fn print_product(product: &Product) {
    println!("id:          {}", product.id);
    println!("title:       {}", product.title);
    println!("description: {}", product.description);
    println!("status:      {}", if product.status { "active" } else { "inactive" });
    match product.updated_at_utc() {
        Some(at) => println!("updated:     {}", at.format("%Y-%m-%d %H:%M")),
        None => println!("updated:     {}", product.updated_at),
    }
    if let Some(thumbnail) = &product.thumbnail {
        println!("thumbnail:   {}", thumbnail);
    }
}

fn print_metrics(metrics: &ProductMetrics) {
    println!("{:<6} {:>6} {:>10}", "Mês", "Vendas", "Receita");
    for month in &metrics.monthly {
        println!("{:<6} {:>6} {:>10}", month.month, month.sold, format!("R$ {}", month.revenue));
    }
    println!(
        "{:<6} {:>6} {:>10}",
        "Total",
        metrics.total_sold(),
        format!("R$ {}", metrics.total_revenue())
    );
    if let Some(best) = metrics.best_month() {
        println!("Melhor mês: {}", best.month);
    }
    println!();
    for item in &metrics.stock_distribution {
        println!("{:<12} {}", item.name, item.value);
    }
}
