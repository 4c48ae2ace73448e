//! Pretty-printing of generated DDL for scripts and logs.

use crate::config::settings::{self, Settings};

const INITIAL_LINE: &str = "\n    ";
const OTHER_LINES: &str = "\n       ";

/// Statement formatting applied before commands reach the targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Formatter {
    #[default]
    None,
    Ddl,
}

impl Formatter {
    /// `Ddl` when `hibernate.format_sql` is true.
    pub fn from_settings(settings: &Settings) -> Self {
        if settings.get_bool_or(settings::FORMAT_SQL, false) {
            Formatter::Ddl
        } else {
            Formatter::None
        }
    }

    pub fn format(&self, sql: &str) -> String {
        match self {
            Formatter::None => sql.to_string(),
            Formatter::Ddl => format_ddl(sql),
        }
    }
}

fn format_ddl(sql: &str) -> String {
    let sql = sql.trim();
    let lower = sql.to_ascii_lowercase();
    if lower.starts_with("create table") {
        format_create_table(sql)
    } else if lower.starts_with("alter table") {
        format_alter_table(sql)
    } else if lower.starts_with("comment on") {
        format_comment_on(sql, &lower)
    } else {
        format!("{}{}", INITIAL_LINE, sql)
    }
}

fn format_create_table(sql: &str) -> String {
    let mut result = String::from(INITIAL_LINE);
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut skip_whitespace = false;

    for c in sql.chars() {
        if skip_whitespace && c.is_whitespace() {
            continue;
        }
        skip_whitespace = false;

        if let Some(q) = quote {
            result.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                result.push(c);
            }
            '(' => {
                depth += 1;
                result.push(c);
                if depth == 1 {
                    result.push_str(OTHER_LINES);
                    skip_whitespace = true;
                }
            }
            ')' => {
                if depth == 1 {
                    result.push_str(INITIAL_LINE);
                }
                result.push(c);
                depth = depth.saturating_sub(1);
            }
            ',' if depth == 1 => {
                result.push(',');
                result.push_str(OTHER_LINES);
                result.push(' ');
                skip_whitespace = true;
            }
            _ => result.push(c),
        }
    }
    result
}

fn format_alter_table(sql: &str) -> String {
    let mut result = String::from(INITIAL_LINE);
    for (i, token) in split_outside_quotes(sql).iter().enumerate() {
        let lower = token.to_lowercase();
        if i > 0 {
            if matches!(lower.as_str(), "add" | "drop" | "foreign" | "references") {
                result.push_str(OTHER_LINES);
            } else {
                result.push(' ');
            }
        }
        result.push_str(token);
    }
    result
}

fn format_comment_on(sql: &str, lower: &str) -> String {
    match lower.find(" is ") {
        Some(index) => format!(
            "{}{} is{}{}",
            INITIAL_LINE,
            &sql[..index],
            OTHER_LINES,
            sql[index + 4..].trim_start()
        ),
        None => format!("{}{}", INITIAL_LINE, sql),
    }
}

fn split_outside_quotes(sql: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => {
                if matches!(c, '\'' | '"' | '`') {
                    quote = Some(c);
                }
                current.push(c);
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_leaves_statement_alone() {
        assert_eq!(Formatter::None.format("drop table t"), "drop table t");
    }

    #[test]
    fn test_create_table_one_column_per_line() {
        let formatted = Formatter::Ddl.format(
            "create table customer (id bigint not null, name varchar(80), primary key (id))",
        );
        assert_eq!(
            formatted,
            "\n    create table customer (\n       id bigint not null,\n        name varchar(80),\n        primary key (id)\n    )"
        );
    }

    #[test]
    fn test_create_table_ignores_commas_in_literals() {
        let formatted =
            Formatter::Ddl.format("create table t (a varchar(10) default 'x, y', b int)");
        assert!(formatted.contains("default 'x, y',\n        b int"));
    }

    #[test]
    fn test_alter_table_breaks_before_clauses() {
        let formatted = Formatter::Ddl.format(
            "alter table orders add constraint fk_c foreign key (cid) references customer",
        );
        assert_eq!(
            formatted,
            "\n    alter table orders\n       add constraint fk_c\n       foreign key (cid)\n       references customer"
        );
    }

    #[test]
    fn test_comment_on() {
        assert_eq!(
            Formatter::Ddl.format("comment on table t is 'a table'"),
            "\n    comment on table t is\n       'a table'"
        );
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings::new().with(settings::FORMAT_SQL, true);
        assert_eq!(Formatter::from_settings(&settings), Formatter::Ddl);
        assert_eq!(Formatter::from_settings(&Settings::new()), Formatter::None);
    }
}
