//! Property tests for scheduler output parsing and dependency rendering.

use cluster_sched::{Dependency, slurm, torque};
use proptest::prelude::*;

proptest! {
    #[test]
    fn sbatch_id_round_trips(id in any::<u64>()) {
        let output = format!("Submitted batch job {id}\n");
        prop_assert_eq!(slurm::parse_sbatch_output(&output).unwrap(), id.to_string());
    }

    #[test]
    fn qsub_id_ignores_server_suffix(id in any::<u64>(), server in "[a-z][a-z0-9.-]{0,20}") {
        let output = format!("{id}.{server}\n");
        prop_assert_eq!(torque::parse_qsub_output(&output).unwrap(), id.to_string());
    }

    #[test]
    fn sbatch_rejects_non_numeric_ids(word in "[a-zA-Z]{1,12}") {
        let output = format!("Submitted batch job {word}");
        prop_assert!(slurm::parse_sbatch_output(&output).is_err());
    }

    #[test]
    fn slurm_dependency_lists_every_id(ids in prop::collection::vec(any::<u32>(), 1..8)) {
        let ids: Vec<String> = ids.iter().map(u32::to_string).collect();
        let args = slurm::dependency_args(&ids);
        prop_assert_eq!(args.len(), 1);
        let listed: Vec<&str> = args[0]
            .strip_prefix("--dependency=afterok:")
            .unwrap()
            .split(':')
            .collect();
        prop_assert_eq!(listed, ids.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn torque_dependency_lists_every_id(ids in prop::collection::vec(any::<u32>(), 1..8)) {
        let ids: Vec<String> = ids.iter().map(u32::to_string).collect();
        let args = torque::dependency_args(&ids);
        prop_assert_eq!(args.len(), 2);
        prop_assert_eq!(args[0].as_str(), "-W");
        let listed: Vec<&str> = args[1]
            .strip_prefix("depend=")
            .unwrap()
            .split(',')
            .map(|entry| entry.strip_prefix("afterok:").unwrap())
            .collect();
        prop_assert_eq!(listed, ids.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn dependency_parse_accepts_digits(id in "[0-9]{1,18}") {
        let dependency = Dependency::parse(&id).unwrap();
        prop_assert_eq!(dependency.to_string(), id);
    }

    #[test]
    fn dependency_parse_rejects_other_text(id in "[0-9]{0,4}[a-z_.:-][0-9a-z]{0,4}") {
        prop_assert!(Dependency::parse(&id).is_err());
    }
}

#[test]
fn empty_dependency_lists_render_nothing() {
    assert!(slurm::dependency_args(&[]).is_empty());
    assert!(torque::dependency_args(&[]).is_empty());
}
