use std::collections::HashMap;

use super::{multi_user, schema, single_user, Outcome, Session};
use crate::backend::{Connection, IsolationLevel};
use crate::error::BenchResult;
use crate::verifier;

pub type TestFn<C> = fn(&mut Session<'_, C>) -> BenchResult<Outcome>;

pub struct TestEntry<C: Connection> {
    pub op: TestFn<C>,
    pub isolation: IsolationLevel,
}

impl<C: Connection> Clone for TestEntry<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: Connection> Copy for TestEntry<C> {}

/// Name to test mapping. Immutable once built.
pub struct TestRegistry<C: Connection> {
    entries: HashMap<&'static str, TestEntry<C>>,
}

pub struct TestRegistryBuilder<C: Connection> {
    entries: HashMap<&'static str, TestEntry<C>>,
}

impl<C: Connection> Default for TestRegistryBuilder<C> {
    fn default() -> Self {
        TestRegistryBuilder {
            entries: HashMap::new(),
        }
    }
}

impl<C: Connection> TestRegistryBuilder<C> {
    /// Registers a read-committed test.
    pub fn test(self, name: &'static str, op: TestFn<C>) -> Self {
        self.with_isolation(name, op, IsolationLevel::ReadCommitted)
    }

    /// Registers a test that needs repeatable reads.
    pub fn repeatable(self, name: &'static str, op: TestFn<C>) -> Self {
        self.with_isolation(name, op, IsolationLevel::RepeatableRead)
    }

    pub fn with_isolation(
        mut self,
        name: &'static str,
        op: TestFn<C>,
        isolation: IsolationLevel,
    ) -> Self {
        let prev = self.entries.insert(name, TestEntry { op, isolation });
        assert!(prev.is_none(), "test {} registered twice", name);
        self
    }

    pub fn build(self) -> TestRegistry<C> {
        TestRegistry {
            entries: self.entries,
        }
    }
}

impl<C: Connection> TestRegistry<C> {
    pub fn builder() -> TestRegistryBuilder<C> {
        TestRegistryBuilder::default()
    }

    /// The complete AS3AP catalog.
    pub fn standard() -> Self {
        Self::builder()
            // Schema and indexes
            .test("create_tables", schema::create_tables)
            .test("create_idx_uniques_key_bt", schema::create_idx_uniques_key_bt)
            .test("create_idx_updates_key_bt", schema::create_idx_updates_key_bt)
            .test("create_idx_hundred_key_bt", schema::create_idx_hundred_key_bt)
            .test("create_idx_tenpct_key_bt", schema::create_idx_tenpct_key_bt)
            .test("create_idx_tenpct_key_code_bt", schema::create_idx_tenpct_key_code_bt)
            .test("create_idx_tiny_key_bt", schema::create_idx_tiny_key_bt)
            .test("create_idx_tenpct_int_bt", schema::create_idx_tenpct_int_bt)
            .test("create_idx_tenpct_signed_bt", schema::create_idx_tenpct_signed_bt)
            .test("create_idx_uniques_code_h", schema::create_idx_uniques_code_h)
            .test("create_idx_tenpct_double_bt", schema::create_idx_tenpct_double_bt)
            .test("create_idx_updates_decim_bt", schema::create_idx_updates_decim_bt)
            .test("create_idx_tenpct_float_bt", schema::create_idx_tenpct_float_bt)
            .test("create_idx_updates_int_bt", schema::create_idx_updates_int_bt)
            .test("create_idx_tenpct_decim_bt", schema::create_idx_tenpct_decim_bt)
            .test("create_idx_hundred_code_h", schema::create_idx_hundred_code_h)
            .test("create_idx_tenpct_name_h", schema::create_idx_tenpct_name_h)
            .test("create_idx_updates_code_h", schema::create_idx_updates_code_h)
            .test("create_idx_tenpct_code_h", schema::create_idx_tenpct_code_h)
            .test("create_idx_updates_double_bt", schema::create_idx_updates_double_bt)
            .test("create_idx_hundred_foreign", schema::create_idx_hundred_foreign)
            .test("drop_updates_keys", schema::drop_updates_keys)
            .test("integrity_test", schema::integrity_test)
            .test("integrity_restore", schema::integrity_restore)
            // Single user
            .test("sel_1_cl", single_user::sel_1_cl)
            .test("sel_1_ncl", single_user::sel_1_ncl)
            .test("sel_100_cl", single_user::sel_100_cl)
            .test("sel_100_ncl", single_user::sel_100_ncl)
            .test("sel_10pct_ncl", single_user::sel_10pct_ncl)
            .test("sel_variable_select_low", single_user::sel_variable_select_low)
            .test("sel_variable_select_high", single_user::sel_variable_select_high)
            .test("table_scan", single_user::table_scan)
            .test("join_2", single_user::join_2)
            .test("join_2_cl", single_user::join_2_cl)
            .test("join_2_ncl", single_user::join_2_ncl)
            .test("join_3_cl", single_user::join_3_cl)
            .test("join_3_ncl", single_user::join_3_ncl)
            .test("join_4_cl", single_user::join_4_cl)
            .test("join_4_ncl", single_user::join_4_ncl)
            .test("proj_100", single_user::proj_100)
            .test("proj_10pct", single_user::proj_10pct)
            .test("agg_func", single_user::agg_func)
            .test("agg_scal", single_user::agg_scal)
            .test("agg_simple_report", single_user::agg_simple_report)
            .test("agg_info_retrieval", single_user::agg_info_retrieval)
            .test("agg_create_view", single_user::agg_create_view)
            .test("agg_subtotal_report", single_user::agg_subtotal_report)
            .test("agg_total_report", single_user::agg_total_report)
            .test("bulk_save", single_user::bulk_save)
            .test("bulk_modify", single_user::bulk_modify)
            .test("bulk_append", single_user::bulk_append)
            .test("bulk_delete", single_user::bulk_delete)
            .test("upd_append_duplicate", single_user::upd_append_duplicate)
            .test("upd_remove_duplicate", single_user::upd_remove_duplicate)
            .test("upd_app_t_mid", single_user::upd_app_t_mid)
            .test("upd_mod_t_mid", single_user::upd_mod_t_mid)
            .test("upd_del_t_mid", single_user::upd_del_t_mid)
            .test("upd_app_t_end", single_user::upd_app_t_end)
            .test("upd_mod_t_end", single_user::upd_mod_t_end)
            .test("upd_del_t_end", single_user::upd_del_t_end)
            .test("upd_mod_t_cod", single_user::upd_mod_t_cod)
            .test("upd_mod_t_int", single_user::upd_mod_t_int)
            // Multi user
            .repeatable("o_mode_tiny", multi_user::o_mode_tiny)
            .repeatable("o_mode_100k", multi_user::o_mode_100k)
            .test("mu_ir_select", multi_user::mu_ir_select)
            .test("mu_oltp_update", multi_user::mu_oltp_update)
            .repeatable("mu_sel_100_seq", verifier::mu_sel_100_seq)
            .repeatable("mu_sel_100_rand", verifier::mu_sel_100_rand)
            .repeatable("mu_mod_100_seq", verifier::mu_mod_100_seq)
            .repeatable("mu_mod_100_rand", verifier::mu_mod_100_rand)
            .repeatable("mu_unmod_100_seq", verifier::mu_unmod_100_seq)
            .repeatable("mu_unmod_100_rand", verifier::mu_unmod_100_rand)
            .test("mu_checkmod_100_seq", verifier::mu_checkmod_100_seq)
            .repeatable("mu_checkmod_100_rand", verifier::mu_checkmod_100_rand)
            .test("mu_drop_sel100_seq", verifier::mu_drop_sel100_seq)
            .test("mu_drop_sel100_rand", verifier::mu_drop_sel100_rand)
            .build()
    }

    /// Looks up a test.
    ///
    /// # Panics
    ///
    /// Panics if no test is registered under `name`.
    pub fn get(&self, name: &str) -> TestEntry<C> {
        match self.entries.get(name) {
            Some(entry) => *entry,
            None => panic!("Unknown test {}", name),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
