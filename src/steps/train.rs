//! Abbreviated training run

use crate::config::Config;
use crate::runner::CommandSpec;
use crate::steps::{script_command, PROJECT_ENV_VAR};

/// Command for a short training run that logs to the workflow's project
pub fn train_command(config: &Config) -> CommandSpec {
    let t = &config.training;
    let mut spec = script_command(config, &config.commands.train_script)
        .flag("--data_class", &t.data_class)
        .flag("--model_class", &t.model_class)
        .flag("--loss", &t.loss)
        .flag("--limit_train_batches", t.limit_train_batches)
        .flag("--limit_val_batches", t.limit_val_batches)
        .flag("--limit_test_batches", t.limit_test_batches)
        .flag("--num_sanity_val_steps", t.num_sanity_val_steps)
        .flag("--num_workers", t.num_workers)
        .flag("--tf_layers", t.tf_layers)
        .flag("--tf_nhead", t.tf_nhead)
        .flag("--tf_dim", t.tf_dim)
        .flag("--tf_fc_dim", t.tf_fc_dim)
        .flag("--batch_size", t.batch_size)
        .flag("--lr", t.lr)
        .flag("--max_epochs", t.max_epochs)
        .env(PROJECT_ENV_VAR, config.project());

    if t.wandb {
        spec = spec.arg("--wandb");
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackingEnv;

    #[test]
    fn test_train_command_flags() {
        let config = Config::default();
        let spec = train_command(&config);

        assert_eq!(spec.program, "python");
        assert_eq!(spec.args[0], "training/run_experiment.py");
        assert_eq!(spec.flag_value("--model_class"), Some("ResnetTransformer"));
        assert_eq!(spec.flag_value("--data_class"), Some("IAMParagraphs"));
        assert_eq!(spec.flag_value("--batch_size"), Some("2"));
        assert_eq!(spec.flag_value("--lr"), Some("0.0001"));
        assert!(spec.has_arg("--wandb"));
    }

    #[test]
    fn test_train_command_exports_project() {
        let mut config = Config::default();
        config.tracking.env = TrackingEnv::Ci;
        let spec = train_command(&config);

        assert!(spec
            .env
            .iter()
            .any(|(k, v)| k == PROJECT_ENV_VAR && v == "fsdl-testing-2022-ci"));
    }

    #[test]
    fn test_train_command_without_tracking() {
        let mut config = Config::default();
        config.training.wandb = false;
        assert!(!train_command(&config).has_arg("--wandb"));
    }
}
