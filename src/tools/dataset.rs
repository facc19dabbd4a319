//! 电影数据集与查询求值
//!
//! 内存表（title / year / genre / rating），可从 CSV 加载，带内置样例兜底。
//! 查询语言：0..n 个过滤段 + 1 个聚合段，用 `|` 连接，如
//! `year >= 2020 | mean(rating)`；聚合支持 count / mean / min / max / sum /
//! top(n, col) / columns。所有求值错误以 Err(String) 返回，由工具层映射为类型化错误。

use std::path::Path;

use serde::Deserialize;

/// 单行数据
#[derive(Debug, Clone, Deserialize)]
pub struct Movie {
    pub title: String,
    pub year: i64,
    pub genre: String,
    pub rating: f64,
}

/// 数据列名（查询语言与 CSV 头一致）
pub const COLUMNS: [&str; 4] = ["title", "year", "genre", "rating"];

/// 内存电影表
#[derive(Debug, Clone)]
pub struct MovieFrame {
    rows: Vec<Movie>,
}

impl MovieFrame {
    /// 内置样例数据（无 CSV 时的兜底）
    pub fn builtin_sample() -> Self {
        let rows = [
            ("The Quiet Harbor", 2018, "Drama", 7.4),
            ("Neon Circuit", 2021, "Sci-Fi", 8.1),
            ("Paper Lanterns", 2015, "Romance", 6.8),
            ("Iron Meridian", 2019, "Action", 7.0),
            ("The Last Ledger", 2022, "Thriller", 7.9),
            ("Glass Orchard", 2020, "Drama", 8.3),
            ("Midnight Cartographer", 2017, "Mystery", 7.2),
            ("Solar Winds", 2023, "Sci-Fi", 6.5),
            ("The Borrowed Coast", 2016, "Drama", 6.9),
            ("Crimson Aperture", 2021, "Thriller", 7.6),
            ("A Fistful of Static", 2014, "Action", 6.2),
            ("The Winter Archivist", 2022, "Mystery", 8.0),
        ];
        Self {
            rows: rows
                .into_iter()
                .map(|(title, year, genre, rating)| Movie {
                    title: title.to_string(),
                    year,
                    genre: genre.to_string(),
                    rating,
                })
                .collect(),
        }
    }

    /// 从 CSV 加载（header: title,year,genre,rating；支持带引号的字段）
    pub fn from_csv(path: &Path) -> Result<Self, String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            let movie: Movie = record.map_err(|e| format!("bad row: {e}"))?;
            rows.push(movie);
        }
        if rows.is_empty() {
            return Err("dataset is empty".to_string());
        }
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 求值查询：过滤段从左到右应用，末段必须是聚合
    pub fn evaluate(&self, query: &str) -> Result<String, String> {
        let segments: Vec<&str> = query.split('|').map(str::trim).collect();
        let (filters, agg) = segments.split_at(segments.len() - 1);
        let agg = agg[0];
        if agg.is_empty() {
            return Err("empty query".to_string());
        }

        let mut rows: Vec<&Movie> = self.rows.iter().collect();
        for f in filters {
            let filter = Filter::parse(f)?;
            rows.retain(|m| filter.matches(m));
        }

        evaluate_aggregation(agg, &rows)
    }
}

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

/// 过滤段：`column op literal`
struct Filter {
    column: String,
    op: Op,
    literal: String,
}

impl Filter {
    fn parse(segment: &str) -> Result<Self, String> {
        // 双字符运算符优先，避免 ">=" 被拆成 ">" + "="
        let ops = [
            ("==", Op::Eq),
            ("!=", Op::Ne),
            (">=", Op::Ge),
            ("<=", Op::Le),
            (">", Op::Gt),
            ("<", Op::Lt),
        ];
        for (sym, op) in ops {
            if let Some(pos) = segment.find(sym) {
                let column = segment[..pos].trim().to_string();
                let literal = segment[pos + sym.len()..]
                    .trim()
                    .trim_matches(|c| c == '"' || c == '\'')
                    .to_string();
                if !COLUMNS.contains(&column.as_str()) {
                    return Err(format!("unknown column '{column}' (have: {})", COLUMNS.join(", ")));
                }
                if literal.is_empty() {
                    return Err(format!("filter '{segment}': missing literal"));
                }
                return Ok(Self { column, op, literal });
            }
        }
        Err(format!("cannot parse filter '{segment}' (expected: column op literal)"))
    }

    fn matches(&self, movie: &Movie) -> bool {
        match numeric_field(movie, &self.column) {
            Some(value) => match self.literal.parse::<f64>() {
                Ok(lit) => match self.op {
                    Op::Eq => value == lit,
                    Op::Ne => value != lit,
                    Op::Ge => value >= lit,
                    Op::Le => value <= lit,
                    Op::Gt => value > lit,
                    Op::Lt => value < lit,
                },
                Err(_) => false,
            },
            None => {
                let value = string_field(movie, &self.column);
                match self.op {
                    Op::Eq => value.eq_ignore_ascii_case(&self.literal),
                    Op::Ne => !value.eq_ignore_ascii_case(&self.literal),
                    // 字符串列不支持大小比较
                    _ => false,
                }
            }
        }
    }
}

fn numeric_field(movie: &Movie, column: &str) -> Option<f64> {
    match column {
        "year" => Some(movie.year as f64),
        "rating" => Some(movie.rating),
        _ => None,
    }
}

fn string_field<'a>(movie: &'a Movie, column: &str) -> &'a str {
    match column {
        "title" => &movie.title,
        "genre" => &movie.genre,
        _ => "",
    }
}

fn evaluate_aggregation(agg: &str, rows: &[&Movie]) -> Result<String, String> {
    let (func, inner) = split_call(agg)?;

    match func {
        "count" => Ok(format!("count = {}", rows.len())),
        "columns" => Ok(format!("columns: {}", COLUMNS.join(", "))),
        "mean" | "min" | "max" | "sum" => {
            let column = inner.trim();
            if rows.is_empty() {
                return Err("no rows match the filter".to_string());
            }
            let values: Vec<f64> = rows
                .iter()
                .map(|m| {
                    numeric_field(m, column)
                        .ok_or_else(|| format!("'{column}' is not a numeric column"))
                })
                .collect::<Result<_, _>>()?;
            let result = match func {
                "mean" => values.iter().sum::<f64>() / values.len() as f64,
                "min" => values.iter().cloned().fold(f64::INFINITY, f64::min),
                "max" => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                _ => values.iter().sum::<f64>(),
            };
            Ok(format!("{func}({column}) = {}", format_number(result)))
        }
        "top" => {
            let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
            if parts.len() != 2 {
                return Err("top expects (n, column)".to_string());
            }
            let n: usize = parts[0].parse().map_err(|e| format!("bad n: {e}"))?;
            let column = parts[1];
            if numeric_field(rows.first().copied().unwrap_or(&PROBE), column).is_none() {
                return Err(format!("'{column}' is not a numeric column"));
            }
            let mut sorted: Vec<&Movie> = rows.to_vec();
            sorted.sort_by(|a, b| {
                let av = numeric_field(a, column).unwrap_or(0.0);
                let bv = numeric_field(b, column).unwrap_or(0.0);
                bv.partial_cmp(&av).unwrap_or(std::cmp::Ordering::Equal)
            });
            let lines: Vec<String> = sorted
                .iter()
                .take(n)
                .map(|m| format!("{} ({}): {}", m.title, m.year, format_number(m.rating)))
                .collect();
            if lines.is_empty() {
                return Err("no rows match the filter".to_string());
            }
            Ok(lines.join("\n"))
        }
        other => Err(format!(
            "unknown aggregation '{other}' (have: count, mean, min, max, sum, top, columns)"
        )),
    }
}

/// top 的列校验在空结果集上也要工作，用探针行代替
const PROBE: Movie = Movie {
    title: String::new(),
    year: 0,
    genre: String::new(),
    rating: 0.0,
};

/// 把 `func(args)` 拆为 (func, args)
fn split_call(agg: &str) -> Result<(&str, &str), String> {
    let open = agg
        .find('(')
        .ok_or_else(|| format!("'{agg}' is not an aggregation call"))?;
    let close = agg
        .rfind(')')
        .ok_or_else(|| format!("'{agg}': missing closing paren"))?;
    if close < open {
        return Err(format!("'{agg}': malformed call"));
    }
    Ok((agg[..open].trim(), &agg[open + 1..close]))
}

fn format_number(v: f64) -> String {
    if (v - v.round()).abs() < f64::EPSILON {
        format!("{}", v.round() as i64)
    } else {
        format!("{:.2}", v)
    }
}
