use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ColumnTrait, Condition,
};

/// Builds the free-text part of a list filter: a case-insensitive substring
/// match OR-combined across the given columns.
pub struct SearchBuilder {
    pattern: Option<String>,
    conditions: Vec<Condition>,
}

impl SearchBuilder {
    /// A blank or missing term produces no condition at all.
    pub fn new(term: Option<&str>) -> Self {
        let pattern = term
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(like_pattern);
        Self {
            pattern,
            conditions: Vec::new(),
        }
    }

    /// Add a `LOWER(column) LIKE '%term%'` alternative
    pub fn add_like<C: ColumnTrait>(mut self, column: C) -> Self {
        if let Some(pattern) = &self.pattern {
            let expr = Expr::expr(Func::lower(Expr::col(column)))
                .like(LikeExpr::new(pattern.clone()).escape('\\'));
            self.conditions.push(Condition::all().add(expr));
        }
        self
    }

    /// Build the final condition
    pub fn build(self) -> Option<Condition> {
        if self.conditions.is_empty() {
            None
        } else {
            Some(
                self.conditions
                    .into_iter()
                    .fold(Condition::any(), |acc, cond| acc.add(cond)),
            )
        }
    }
}

/// Lower-cases the term, escapes LIKE wildcards and wraps it in `%`.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
