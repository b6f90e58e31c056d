#[cfg(test)]
mod tests {
    use super::super::*;
    use clinomics_ingestion::{SourceApi, SourceKind};

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:3001");
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.http.max_concurrent_requests, 6);
        assert_eq!(config.batch.gene_concurrency, 4);
        assert_eq!(config.batch.max_genes, 200);
        assert_eq!(config.batch.timeout_secs, 120);
        assert!(!config.accounts.require_login);
        assert_eq!(config.accounts.free_daily_limit, 5);
        assert_eq!(config.logging.level, "info");
        assert!(config.sources.settings(SourceKind::Expression).enabled);
    }

    #[test]
    fn test_sources_and_fallback_sections() {
        let config = Config::from_toml(
            r#"
            [sources.drug_interaction]
            api = "dgidb_graphql"
            max_rows = 3

            [sources.expression]
            enabled = false

            [fallback]
            drug_interaction = "data/drug_fallback.csv"
            "#,
        )
        .unwrap();

        let drugs = config.sources.settings(SourceKind::DrugInteraction);
        assert_eq!(drugs.api, Some(SourceApi::DgidbGraphql));
        assert_eq!(drugs.max_rows, Some(3));
        assert!(!config.sources.expression.enabled);
        assert_eq!(
            config.fallback.drug_interaction.as_deref(),
            Some(Path::new("data/drug_fallback.csv"))
        );
    }

    #[test]
    fn test_zero_bounds_rejected() {
        assert!(Config::from_toml("[batch]\ngene_concurrency = 0").is_err());
        assert!(Config::from_toml("[http]\nmax_concurrent_requests = 0").is_err());
    }

    #[test]
    fn test_unknown_api_rejected() {
        assert!(Config::from_toml("[sources.mutation]\napi = \"cosmic\"").is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.batch.max_genes, default_max_genes());
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_toml(include_str!("../../../../clinomics.example.toml")).unwrap();
        assert_eq!(config.sources.clinical_trial.max_rows, Some(5));
        assert!(config.fallback.drug_interaction.is_some());
        assert!(config.fallback.expression.is_some());
        assert!(!config.accounts.require_login);
    }
}
