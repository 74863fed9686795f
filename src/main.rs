use std::{process, sync::Arc};

use murmur::{
    application::error::AppError,
    application::groups::CreateGroupCommand,
    cache::CacheConfig,
    config,
    infra::{
        app::{Repositories, build_application_context},
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, HttpState},
        memory::MemoryRepositories,
        telemetry,
        uploads::UploadStorage,
    },
};
use tokio::try_join;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(InfraError::from)?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Users(args) => match args.command {
            config::UsersCommand::Create(create) => run_create_user(settings, create).await,
        },
        config::Command::Groups(args) => match args.command {
            config::GroupsCommand::Create(create) => run_create_group(settings, create).await,
        },
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    let upload_storage = Arc::new(
        UploadStorage::new(settings.uploads.directory.clone()).map_err(InfraError::Io)?,
    );
    let max_request_bytes = usize::try_from(settings.uploads.max_request_bytes.get())
        .map_err(|_| AppError::validation("uploads.max_request_bytes exceeds this platform"))?;

    let app = build_application_context(
        &repositories,
        upload_storage,
        CacheConfig::from(&settings.cache),
        max_request_bytes,
    );

    serve_http(&settings, app.http_state, app.admin_state).await
}

async fn run_create_user(
    settings: config::Settings,
    args: config::CreateUserArgs,
) -> Result<(), AppError> {
    let repositories = init_persistent_repositories(&settings).await?;
    let registration = repositories.accounts().register(&args.username).await?;

    info!(
        target = "murmur::cli",
        username = %registration.user.username,
        "Created user"
    );
    println!("{}", registration.token);
    Ok(())
}

async fn run_create_group(
    settings: config::Settings,
    args: config::CreateGroupArgs,
) -> Result<(), AppError> {
    let repositories = init_persistent_repositories(&settings).await?;
    let group = repositories
        .groups_service()
        .create(CreateGroupCommand {
            title: args.title,
            slug: args.slug,
            description: args.description,
        })
        .await?;

    println!("{}", group.slug);
    Ok(())
}

/// Postgres when a database URL is configured, otherwise the in-memory store.
async fn init_repositories(settings: &config::Settings) -> Result<Repositories, AppError> {
    match settings.database.url.as_deref() {
        Some(url) => connect_postgres(url, settings).await,
        None => {
            warn!(
                target = "murmur::bootstrap",
                "database.url is not set; using the in-memory store, data is lost on exit"
            );
            Ok(Repositories::from_backend(Arc::new(
                MemoryRepositories::new(),
            )))
        }
    }
}

/// Management commands write through to Postgres; an in-memory store would
/// discard their effect on exit.
async fn init_persistent_repositories(
    settings: &config::Settings,
) -> Result<Repositories, AppError> {
    let url = settings.database.url.as_deref().ok_or_else(|| {
        AppError::validation("database.url must be configured for management commands")
    })?;
    connect_postgres(url, settings).await
}

async fn connect_postgres(url: &str, settings: &config::Settings) -> Result<Repositories, AppError> {
    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::migration(err.to_string()))?;

    info!(target = "murmur::bootstrap", "Connected to Postgres");
    Ok(Repositories::from_backend(Arc::new(
        PostgresRepositories::new(pool),
    )))
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(InfraError::from)?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(InfraError::from)?;

    info!(
        target = "murmur::bootstrap",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "Listening"
    );

    let public_server = axum::serve(public_listener, public_router.into_make_service());
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service());

    try_join!(public_server, admin_server)
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
