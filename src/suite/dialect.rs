/// The join queries, which differ between SQL dialects. Everything else in
/// the suite is shared.
pub trait JoinQueries: Send + Sync {
    fn name(&self) -> &'static str;
    fn join_2(&self) -> &'static str;
    fn join_2_cl(&self) -> &'static str;
    fn join_2_ncl(&self) -> &'static str;
    fn join_3_cl(&self) -> &'static str;
    fn join_3_ncl(&self) -> &'static str;
    fn join_4_cl(&self) -> &'static str;
    fn join_4_ncl(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    #[default]
    Sql87,
    Sql92,
}

impl SqlDialect {
    pub fn joins(self) -> Box<dyn JoinQueries> {
        match self {
            SqlDialect::Sql87 => Box::new(Sql87),
            SqlDialect::Sql92 => Box::new(Sql92),
        }
    }
}

/// Joins written with comma-separated tables and `where` predicates.
pub struct Sql87;

impl JoinQueries for Sql87 {
    fn name(&self) -> &'static str {
        "SQL87"
    }

    fn join_2(&self) -> &'static str {
        "select uniques.col_signed, uniques.col_name, hundred.col_signed, hundred.col_name \
         from uniques, hundred \
         where uniques.col_address = hundred.col_address \
         and uniques.col_address = 'SILICON VALLEY'"
    }

    fn join_2_cl(&self) -> &'static str {
        "select uniques.col_signed, uniques.col_name, hundred.col_signed, hundred.col_name \
         from uniques, hundred \
         where uniques.col_key = hundred.col_key \
         and uniques.col_key = 1000"
    }

    fn join_2_ncl(&self) -> &'static str {
        "select uniques.col_signed, uniques.col_name, hundred.col_signed, hundred.col_name \
         from uniques, hundred \
         where uniques.col_code = hundred.col_code \
         and uniques.col_code = 'BENCHMARKS'"
    }

    fn join_3_cl(&self) -> &'static str {
        "select uniques.col_signed, uniques.col_date, hundred.col_signed, hundred.col_date, \
         tenpct.col_signed, tenpct.col_date \
         from uniques, hundred, tenpct \
         where uniques.col_key = hundred.col_key \
         and uniques.col_key = tenpct.col_key \
         and uniques.col_key = 1000"
    }

    fn join_3_ncl(&self) -> &'static str {
        "select uniques.col_signed, uniques.col_date, hundred.col_signed, hundred.col_date, \
         tenpct.col_signed, tenpct.col_date \
         from uniques, hundred, tenpct \
         where uniques.col_code = hundred.col_code \
         and uniques.col_code = tenpct.col_code \
         and uniques.col_code = 'BENCHMARKS'"
    }

    fn join_4_cl(&self) -> &'static str {
        "select uniques.col_date, hundred.col_date, tenpct.col_date, updates.col_date \
         from uniques, hundred, tenpct, updates \
         where uniques.col_key = hundred.col_key \
         and uniques.col_key = tenpct.col_key \
         and uniques.col_key = updates.col_key \
         and uniques.col_key = 1000"
    }

    fn join_4_ncl(&self) -> &'static str {
        "select uniques.col_date, hundred.col_date, tenpct.col_date, updates.col_date \
         from uniques, hundred, tenpct, updates \
         where uniques.col_code = hundred.col_code \
         and uniques.col_code = tenpct.col_code \
         and uniques.col_code = updates.col_code \
         and uniques.col_code = 'BENCHMARKS'"
    }
}

/// Joins written with explicit `join .. on` clauses.
pub struct Sql92;

impl JoinQueries for Sql92 {
    fn name(&self) -> &'static str {
        "SQL92"
    }

    fn join_2(&self) -> &'static str {
        "select uniques.col_signed, uniques.col_name, hundred.col_signed, hundred.col_name \
         from uniques \
         join hundred on uniques.col_address = hundred.col_address \
         where uniques.col_address = 'SILICON VALLEY'"
    }

    fn join_2_cl(&self) -> &'static str {
        "select uniques.col_signed, uniques.col_name, hundred.col_signed, hundred.col_name \
         from uniques \
         join hundred on uniques.col_key = hundred.col_key \
         where uniques.col_key = 1000"
    }

    fn join_2_ncl(&self) -> &'static str {
        "select uniques.col_signed, uniques.col_name, hundred.col_signed, hundred.col_name \
         from uniques \
         join hundred on uniques.col_code = hundred.col_code \
         where uniques.col_code = 'BENCHMARKS'"
    }

    fn join_3_cl(&self) -> &'static str {
        "select uniques.col_signed, uniques.col_date, hundred.col_signed, hundred.col_date, \
         tenpct.col_signed, tenpct.col_date \
         from uniques \
         join hundred on uniques.col_key = hundred.col_key \
         join tenpct on uniques.col_key = tenpct.col_key \
         where uniques.col_key = 1000"
    }

    fn join_3_ncl(&self) -> &'static str {
        "select uniques.col_signed, uniques.col_date, hundred.col_signed, hundred.col_date, \
         tenpct.col_signed, tenpct.col_date \
         from uniques \
         join hundred on uniques.col_code = hundred.col_code \
         join tenpct on uniques.col_code = tenpct.col_code \
         where uniques.col_code = 'BENCHMARKS'"
    }

    fn join_4_cl(&self) -> &'static str {
        "select uniques.col_date, hundred.col_date, tenpct.col_date, updates.col_date \
         from uniques \
         join hundred on uniques.col_key = hundred.col_key \
         join tenpct on uniques.col_key = tenpct.col_key \
         join updates on uniques.col_key = updates.col_key \
         where uniques.col_key = 1000"
    }

    fn join_4_ncl(&self) -> &'static str {
        "select uniques.col_date, hundred.col_date, tenpct.col_date, updates.col_date \
         from uniques \
         join hundred on uniques.col_code = hundred.col_code \
         join tenpct on uniques.col_code = tenpct.col_code \
         join updates on uniques.col_code = updates.col_code \
         where uniques.col_code = 'BENCHMARKS'"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn all(j: &dyn JoinQueries) -> Vec<&'static str> {
        vec![
            j.join_2(),
            j.join_2_cl(),
            j.join_2_ncl(),
            j.join_3_cl(),
            j.join_3_ncl(),
            j.join_4_cl(),
            j.join_4_ncl(),
        ]
    }

    #[rstest]
    #[case(SqlDialect::Sql87, "SQL87", false)]
    #[case(SqlDialect::Sql92, "SQL92", true)]
    fn dialect_join_syntax(#[case] dialect: SqlDialect, #[case] name: &str, #[case] explicit: bool) {
        let joins = dialect.joins();
        assert_eq!(joins.name(), name);
        for sql in all(joins.as_ref()) {
            assert_eq!(sql.contains(" join "), explicit, "{}", sql);
        }
    }
}
