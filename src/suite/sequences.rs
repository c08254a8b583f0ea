use super::SuiteOptions;

/// The single-user battery. Later tests depend on the side effects of
/// earlier ones, so the order is fixed.
pub const SINGLE_USER_SEQUENCE: &[&str] = &[
    "sel_1_cl",
    "join_3_cl",
    "sel_100_ncl",
    "table_scan",
    "agg_func",
    "agg_scal",
    "sel_100_cl",
    "join_3_ncl",
    "sel_10pct_ncl",
    "agg_simple_report",
    "agg_info_retrieval",
    "agg_create_view",
    "agg_subtotal_report",
    "agg_total_report",
    "join_2_cl",
    "join_2",
    "sel_variable_select_low",
    "sel_variable_select_high",
    "join_4_cl",
    "proj_100",
    "join_4_ncl",
    "proj_10pct",
    "sel_1_ncl",
    "join_2_ncl",
    "integrity_test",
    "integrity_restore",
    "drop_updates_keys",
    "bulk_save",
    "bulk_modify",
    "upd_append_duplicate",
    "upd_remove_duplicate",
    "upd_app_t_mid",
    "upd_mod_t_mid",
    "upd_del_t_mid",
    "upd_app_t_end",
    "upd_mod_t_end",
    "upd_del_t_end",
    "create_idx_updates_code_h",
    "upd_app_t_mid",
    "upd_mod_t_cod",
    "upd_del_t_mid",
    "create_idx_updates_int_bt",
    "upd_app_t_mid",
    "upd_mod_t_int",
    "upd_del_t_mid",
    "bulk_append",
    "bulk_delete",
];

/// Script of the cross-section worker in the mixed phases.
pub const CROSS_SECTION: &[&str] = &[
    "o_mode_tiny",
    "o_mode_100k",
    "sel_1_ncl",
    "sel_1_ncl",
    "sel_1_ncl",
    "agg_simple_report",
    "mu_sel_100_seq",
    "mu_sel_100_rand",
    "mu_mod_100_seq",
    "mu_mod_100_rand",
    "mu_unmod_100_seq",
    "mu_unmod_100_rand",
];

pub const VERIFY_WINDOWS: &[&str] = &["mu_checkmod_100_seq", "mu_checkmod_100_rand"];

pub const DROP_SIDE_TABLES: &[&str] = &["mu_drop_sel100_seq", "mu_drop_sel100_rand"];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Requires {
    Always,
    Clustered,
    Hash,
}

const INDEX_SEQUENCE: &[(&str, Requires)] = &[
    ("create_idx_uniques_key_bt", Requires::Clustered),
    ("create_idx_updates_key_bt", Requires::Clustered),
    ("create_idx_hundred_key_bt", Requires::Clustered),
    ("create_idx_tenpct_key_bt", Requires::Clustered),
    ("create_idx_tenpct_key_code_bt", Requires::Always),
    ("create_idx_tiny_key_bt", Requires::Always),
    ("create_idx_tenpct_int_bt", Requires::Always),
    ("create_idx_tenpct_signed_bt", Requires::Always),
    ("create_idx_uniques_code_h", Requires::Hash),
    ("create_idx_tenpct_double_bt", Requires::Always),
    ("create_idx_updates_decim_bt", Requires::Always),
    ("create_idx_tenpct_float_bt", Requires::Always),
    ("create_idx_updates_int_bt", Requires::Always),
    ("create_idx_tenpct_decim_bt", Requires::Always),
    ("create_idx_hundred_code_h", Requires::Always),
    ("create_idx_tenpct_name_h", Requires::Hash),
    ("create_idx_updates_code_h", Requires::Hash),
    ("create_idx_tenpct_code_h", Requires::Hash),
    ("create_idx_updates_double_bt", Requires::Always),
    ("create_idx_hundred_foreign", Requires::Always),
];

/// Index builds run after loading, restricted to what the backend supports.
/// Empty when indexes are disabled.
pub fn create_index_sequence(options: &SuiteOptions) -> Vec<&'static str> {
    if !options.use_indexes {
        return Vec::new();
    }
    INDEX_SEQUENCE
        .iter()
        .filter(|(_, requires)| match requires {
            Requires::Always => true,
            Requires::Clustered => options.supports_clustered,
            Requires::Hash => options.supports_hash,
        })
        .map(|(name, _)| *name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(true, false, false, 12)]
    #[case(true, true, false, 16)]
    #[case(true, true, true, 20)]
    #[case(false, true, true, 0)]
    fn index_sequence_follows_capabilities(
        #[case] use_indexes: bool,
        #[case] clustered: bool,
        #[case] hash: bool,
        #[case] expected: usize,
    ) {
        let options = SuiteOptions {
            use_indexes,
            supports_clustered: clustered,
            supports_hash: hash,
            ..SuiteOptions::default()
        };
        let seq = create_index_sequence(&options);
        assert_eq!(seq.len(), expected);
        if use_indexes {
            assert_eq!(seq.last(), Some(&"create_idx_hundred_foreign"));
        }
    }

    #[test]
    fn battery_leaves_update_cycles_balanced() {
        let count = |name: &str| SINGLE_USER_SEQUENCE.iter().filter(|n| **n == name).count();
        assert_eq!(count("upd_app_t_mid"), 3);
        assert_eq!(count("upd_del_t_mid"), 3);
        assert_eq!(SINGLE_USER_SEQUENCE.first(), Some(&"sel_1_cl"));
        assert_eq!(SINGLE_USER_SEQUENCE.last(), Some(&"bulk_delete"));
        assert_eq!(CROSS_SECTION.iter().filter(|n| **n == "sel_1_ncl").count(), 3);
    }
}
