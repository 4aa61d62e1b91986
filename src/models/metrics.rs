//! Dashboard metrics. The values are fixed sample data; there is no metrics
//! endpoint in the API.

use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthlyMetric {
    pub month: &'static str,
    pub sold: u32,
    /// In BRL
    pub revenue: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DistributionItem {
    pub name: &'static str,
    pub value: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMetrics {
    pub monthly: Vec<MonthlyMetric>,
    pub stock_distribution: Vec<DistributionItem>,
    pub colors: Vec<&'static str>,
}

impl ProductMetrics {
    pub fn mock() -> Self {
        let monthly = vec![
            MonthlyMetric { month: "Jan", sold: 32, revenue: 4200 },
            MonthlyMetric { month: "Fev", sold: 28, revenue: 3800 },
            MonthlyMetric { month: "Mar", sold: 41, revenue: 5150 },
            MonthlyMetric { month: "Abr", sold: 35, revenue: 4700 },
            MonthlyMetric { month: "Mai", sold: 50, revenue: 6300 },
            MonthlyMetric { month: "Jun", sold: 46, revenue: 5920 },
        ];
        let stock_distribution = vec![
            DistributionItem { name: "Em estoque", value: 120 },
            DistributionItem { name: "Esgotado", value: 24 },
            DistributionItem { name: "Inativo", value: 12 },
        ];
        let colors = vec!["#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6"];

        Self {
            monthly,
            stock_distribution,
            colors,
        }
    }

    pub fn total_sold(&self) -> u32 {
        self.monthly.iter().map(|m| m.sold).sum()
    }

    pub fn total_revenue(&self) -> u32 {
        self.monthly.iter().map(|m| m.revenue).sum()
    }

    /// Month with the highest revenue.
    pub fn best_month(&self) -> Option<&MonthlyMetric> {
        self.monthly.iter().max_by_key(|m| m.revenue)
    }

    /// Color for the n-th series, cycling through the palette.
    pub fn color(&self, index: usize) -> &'static str {
        self.colors[index % self.colors.len()]
    }
}
