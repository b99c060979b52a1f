use super::formula::{Formula, FormulaError};

/// Airtable never returns more than 100 records per page.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Options for listing records from a table.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub formula: Option<Formula>,
    pub sort: Vec<(String, SortDirection)>,
    pub max_records: Option<u32>,
    pub page_size: Option<u32>,
    pub view: Option<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, formula: Formula) -> Self {
        self.formula = Some(formula);
        self
    }

    /// Filter only when a formula is given, otherwise list everything.
    pub fn filter_opt(mut self, formula: Option<Formula>) -> Self {
        self.formula = formula;
        self
    }

    pub fn sort_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.sort.push((field.to_string(), direction));
        self
    }

    pub fn max_records(mut self, n: u32) -> Self {
        self.max_records = Some(n);
        self
    }

    pub fn page_size(mut self, n: u32) -> Self {
        self.page_size = Some(n.clamp(1, MAX_PAGE_SIZE));
        self
    }

    pub fn view(mut self, view: &str) -> Self {
        self.view = Some(view.to_string());
        self
    }

    /// Query-string parameters for one page request.
    pub fn to_params(&self, offset: Option<&str>) -> Result<Vec<(String, String)>, FormulaError> {
        let mut params = Vec::new();
        if let Some(ref formula) = self.formula {
            params.push(("filterByFormula".to_string(), formula.render()?));
        }
        for (i, (field, direction)) in self.sort.iter().enumerate() {
            params.push((format!("sort[{}][field]", i), field.clone()));
            params.push((format!("sort[{}][direction]", i), direction.as_str().to_string()));
        }
        if let Some(n) = self.max_records {
            params.push(("maxRecords".to_string(), n.to_string()));
        }
        if let Some(n) = self.page_size {
            params.push(("pageSize".to_string(), n.to_string()));
        }
        if let Some(ref view) = self.view {
            params.push(("view".to_string(), view.clone()));
        }
        if let Some(offset) = offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        Ok(params)
    }
}
