use super::*;

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), DEFAULT_PUBLIC_PORT);
    assert_eq!(settings.server.admin_addr.port(), DEFAULT_ADMIN_PORT);
    assert!(settings.database.url.is_none());
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.index_ttl_seconds.get(), 20);
    assert_eq!(settings.cache.max_entries.get(), 64);
    assert_eq!(settings.uploads.directory, PathBuf::from("media"));
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.public_port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.cache.index_ttl_seconds = Some(60);

    let overrides = ServeOverrides {
        public_port: Some(4321),
        log_level: Some("debug".to_string()),
        cache_index_ttl_seconds: Some(5),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.cache.index_ttl_seconds.get(), 5);
}

#[test]
fn blank_database_url_selects_memory_store() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn zero_values_are_rejected_with_key() {
    let mut raw = RawSettings::default();
    raw.cache.index_ttl_seconds = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero ttl rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.index_ttl_seconds",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.cache.max_entries = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.server.admin_port = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn shared_listener_address_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.admin_port = Some(DEFAULT_PUBLIC_PORT);
    let err = Settings::from_raw(raw).expect_err("same address rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "server.admin_port",
            ..
        }
    ));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn invalid_log_level_names_the_key() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());
    let err = Settings::from_raw(raw).expect_err("bad level rejected");
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["murmur"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "murmur",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
        "--cache-enabled",
        "false",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.database_url.as_deref(),
                Some("postgres://override")
            );
            assert_eq!(serve.overrides.cache_enabled, Some(false));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_users_create_arguments() {
    let args = CliArgs::parse_from([
        "murmur",
        "users",
        "create",
        "--database-url",
        "postgres://example",
        "leo",
    ]);

    match args.command.expect("users command") {
        Command::Users(users) => match users.command {
            UsersCommand::Create(create) => {
                assert_eq!(create.username, "leo");
                assert_eq!(
                    create.database.database_url.as_deref(),
                    Some("postgres://example")
                );
            }
        },
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_groups_create_arguments() {
    let args = CliArgs::parse_from([
        "murmur",
        "groups",
        "create",
        "Rust Meetup",
        "--slug",
        "rust",
        "--description",
        "Monthly talks",
    ]);

    match args.command.expect("groups command") {
        Command::Groups(groups) => match groups.command {
            GroupsCommand::Create(create) => {
                assert_eq!(create.title, "Rust Meetup");
                assert_eq!(create.slug.as_deref(), Some("rust"));
                assert_eq!(create.description, "Monthly talks");
                assert!(create.database.database_url.is_none());
            }
        },
        _ => panic!("wrong command parsed"),
    }

    let args = CliArgs::parse_from(["murmur", "groups", "create", "Cats"]);
    match args.command.expect("groups command") {
        Command::Groups(groups) => match groups.command {
            GroupsCommand::Create(create) => {
                assert!(create.slug.is_none());
                assert_eq!(create.description, "");
            }
        },
        _ => panic!("wrong command parsed"),
    }
}
