//! Document templates
//!
//! A small block-based document model rendered to Markdown, plus the agency's
//! proposal and competitive-analysis templates built on it.

use crate::utils::error::AppResult;
use std::path::{Path, PathBuf};
use tracing::info;

pub const PROPOSAL_FILE: &str = "PLM_Proposal_Template.md";
pub const COMPETITIVE_ANALYSIS_FILE: &str = "PLM_Competitive_Analysis_Template.md";

const BRAND: &str = "PREMIER LEAD MARKETING";
const FOOTER: &str = "Premier Lead Marketing, LLC | Strategic Digital Dominance";

/// One block of a document
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    /// Italic hint for whoever fills the template in
    Note(String),
    KeyValue(Vec<(String, String)>),
    Bullets(Vec<String>),
    Checklist(Vec<String>),
    Numbered(Vec<String>),
    Table { headers: Vec<String>, rows: Vec<Vec<String>> },
    Rule,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(title: &str) -> Self {
        Self { title: title.to_string(), blocks: Vec::new() }
    }
    
    pub fn heading(mut self, level: u8, text: &str) -> Self {
        self.blocks.push(Block::Heading { level, text: text.to_string() });
        self
    }
    
    pub fn paragraph(mut self, text: &str) -> Self {
        self.blocks.push(Block::Paragraph(text.to_string()));
        self
    }
    
    pub fn note(mut self, text: &str) -> Self {
        self.blocks.push(Block::Note(text.to_string()));
        self
    }
    
    pub fn key_values(mut self, pairs: &[(&str, &str)]) -> Self {
        self.blocks.push(Block::KeyValue(
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        ));
        self
    }
    
    pub fn bullets(mut self, items: &[&str]) -> Self {
        self.blocks.push(Block::Bullets(owned(items)));
        self
    }
    
    pub fn checklist(mut self, items: &[&str]) -> Self {
        self.blocks.push(Block::Checklist(owned(items)));
        self
    }
    
    pub fn numbered(mut self, items: &[&str]) -> Self {
        self.blocks.push(Block::Numbered(owned(items)));
        self
    }
    
    pub fn table(mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        self.blocks.push(Block::Table { headers: owned(headers), rows });
        self
    }
    
    pub fn rule(mut self) -> Self {
        self.blocks.push(Block::Rule);
        self
    }
    
    /// Render to Markdown
    pub fn to_markdown(&self) -> String {
        let mut out = vec![format!("# {}", self.title)];
        
        for block in &self.blocks {
            let rendered = match block {
                Block::Heading { level, text } => {
                    format!("{} {}", "#".repeat((*level).clamp(2, 6) as usize), text)
                }
                Block::Paragraph(text) => text.clone(),
                Block::Note(text) => format!("*{}*", text),
                Block::KeyValue(pairs) => {
                    let rows: Vec<Vec<String>> = pairs
                        .iter()
                        .map(|(k, v)| vec![format!("**{}**", k), v.clone()])
                        .collect();
                    render_table(&["Field".to_string(), "Value".to_string()], &rows)
                }
                Block::Bullets(items) => items.iter().map(|i| format!("- {}", i)).collect::<Vec<_>>().join("\n"),
                Block::Checklist(items) => items.iter().map(|i| format!("- [ ] {}", i)).collect::<Vec<_>>().join("\n"),
                Block::Numbered(items) => items
                    .iter()
                    .enumerate()
                    .map(|(n, i)| format!("{}. {}", n + 1, i))
                    .collect::<Vec<_>>()
                    .join("\n"),
                Block::Table { headers, rows } => render_table(headers, rows),
                Block::Rule => "---".to_string(),
            };
            out.push(rendered);
        }
        
        let mut markdown = out.join("\n\n");
        markdown.push('\n');
        markdown
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', "<br>")
}

fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut lines = vec![
        format!("| {} |", headers.iter().map(|h| escape_cell(h)).collect::<Vec<_>>().join(" | ")),
        format!("|{}|", vec![" --- "; headers.len()].join("|")),
    ];
    for row in rows {
        let mut cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
        cells.resize(headers.len(), String::new());
        lines.push(format!("| {} |", cells.join(" | ")));
    }
    lines.join("\n")
}

struct ServiceOffer {
    name: &'static str,
    description: &'static str,
    features: [&'static str; 4],
    price: &'static str,
}

const SERVICES: [ServiceOffer; 7] = [
    ServiceOffer {
        name: "Lead Generation Services",
        description: "Precision-targeted lead generation campaigns using Apollo & Clay integration",
        features: [
            "Multi-channel outreach campaigns",
            "Quality-verified leads delivered to your CRM",
            "Custom targeting based on your ideal customer profile",
            "Weekly lead delivery reports",
        ],
        price: "$____/month",
    },
    ServiceOffer {
        name: "GoHighLevel Automation Setup",
        description: "Complete end-to-end automation platform setup and management",
        features: [
            "Full GHL system setup & configuration",
            "Custom funnels & landing pages",
            "Email & SMS automation sequences",
            "Calendar & booking system integration",
        ],
        price: "$____ setup + $____/month",
    },
    ServiceOffer {
        name: "Marketing Systems & Campaigns",
        description: "Multi-channel marketing infrastructure for lead nurturing",
        features: [
            "Automated follow-up sequences",
            "Multi-channel campaign management",
            "Performance tracking & analytics",
            "A/B testing & optimization",
        ],
        price: "$____/month",
    },
    ServiceOffer {
        name: "Website Development",
        description: "Professional, high-converting website design and development",
        features: [
            "Custom responsive website design",
            "Mobile-optimized layouts",
            "Marketing integration ready",
            "SEO foundation setup",
        ],
        price: "$____ one-time",
    },
    ServiceOffer {
        name: "Client Portal Development",
        description: "Custom client portal for streamlined operations",
        features: [
            "Branded client dashboard",
            "Document management",
            "Communication hub",
            "Progress tracking",
        ],
        price: "$____ one-time",
    },
    ServiceOffer {
        name: "Business Coaching & Strategy",
        description: "Expert guidance for scaling your business",
        features: [
            "Monthly strategy sessions",
            "Competitive market analysis",
            "Growth planning",
            "1-on-1 coaching calls",
        ],
        price: "$____/month",
    },
    ServiceOffer {
        name: "Unified Marketing Portal Access",
        description: "Single dashboard for all marketing metrics and performance",
        features: [
            "Real-time analytics dashboard",
            "Campaign performance tracking",
            "Lead pipeline visualization",
            "ROI reporting & insights",
        ],
        price: "Included with automation package",
    },
];

/// Marketing services proposal
pub fn proposal_template() -> Document {
    let mut doc = Document::new("MARKETING SERVICES PROPOSAL")
        .paragraph(&format!("**{}** | Strategic Digital Dominance", BRAND))
        .rule()
        .heading(2, "CLIENT INFORMATION")
        .key_values(&[
            ("Prepared For:", "[Client Name]"),
            ("Company:", "[Company Name]"),
            ("Date:", "[Date]"),
            ("Valid Until:", "[30 days from date]"),
        ])
        .heading(2, "EXECUTIVE SUMMARY")
        .paragraph(
            "[Brief overview of the client's challenges and goals, and how PLM will deliver results. \
             Keep this to 2-3 sentences that speak directly to their pain points and desired outcomes.]",
        )
        .heading(2, "PROPOSED SERVICES")
        .note("[Select applicable services below - delete sections not needed]");
    
    for service in &SERVICES {
        doc = doc
            .checklist(&[service.name])
            .paragraph(service.description)
            .bullets(&service.features)
            .paragraph(&format!("Investment: **{}**", service.price));
    }
    
    doc.heading(2, "INVESTMENT SUMMARY")
        .key_values(&[
            ("One-Time Setup Fees:", "$____"),
            ("Monthly Retainer:", "$____"),
            ("TOTAL MONTHLY INVESTMENT:", "$____"),
            ("Contract Term:", "[Month-to-month / 3 months / 6 months]"),
        ])
        .heading(2, "PROJECT TIMELINE")
        .table(
            &["Phase", "Timeline"],
            rows(&[
                ["Discovery & Audit", "Week 1"],
                ["Strategy & Planning", "Week 2"],
                ["Implementation", "Weeks 3-4"],
                ["Optimize & Scale", "Ongoing"],
            ]),
        )
        .heading(2, "TERMS & CONDITIONS")
        .bullets(&[
            "Payment is due upon signing. Monthly retainer billed on the 1st of each month.",
            "30-day notice required for service cancellation after initial term.",
            "All deliverables remain property of PLM until final payment is received.",
            "Client agrees to provide necessary access, content, and feedback in a timely manner.",
            "Results are not guaranteed but our team is committed to achieving measurable outcomes.",
        ])
        .heading(2, "AGREEMENT")
        .paragraph("By signing below, both parties agree to the terms outlined in this proposal.")
        .table(
            &["CLIENT:", "PREMIER LEAD MARKETING:"],
            rows(&[
                ["________________________________", "________________________________"],
                ["Signature", "[Authorized Signatory]"],
                ["Date: _______________", "Date: _______________"],
            ]),
        )
        .rule()
        .note(FOOTER)
}

/// Competitive market analysis
pub fn competitive_analysis_template() -> Document {
    let mut doc = Document::new("COMPETITIVE MARKET ANALYSIS")
        .paragraph(&format!("**{}**", BRAND))
        .rule()
        .heading(2, "ANALYSIS OVERVIEW")
        .key_values(&[
            ("Client:", "[Client Name]"),
            ("Industry:", "[Industry]"),
            ("Market:", "[Geographic Market / Niche]"),
            ("Analysis Date:", "[Date]"),
            ("Prepared By:", "Premier Lead Marketing"),
        ])
        .heading(2, "EXECUTIVE SUMMARY")
        .paragraph("[2-3 paragraph summary of key findings, competitive landscape, and strategic recommendations]")
        .heading(2, "COMPETITOR OVERVIEW")
        .table(
            &["Competitor", "Services", "Pricing", "Strengths", "Weaknesses"],
            (1..=5)
                .map(|n| {
                    let mut row = vec![format!("[Competitor {}]", n)];
                    row.extend(std::iter::repeat("[...]".to_string()).take(4));
                    row
                })
                .collect(),
        );
    
    for n in 1..=3 {
        doc = doc.heading(3, &format!("COMPETITOR {}: [Name]", n)).key_values(&[
            ("Website:", "[URL]"),
            ("Services Offered:", "[List key services]"),
            ("Pricing Model:", "[Pricing structure]"),
            ("Target Market:", "[Who they serve]"),
            ("Marketing Channels:", "[How they acquire customers]"),
            ("Key Differentiators:", "[What makes them unique]"),
            ("Vulnerabilities:", "[Where you can compete]"),
        ]);
    }
    
    let factors = ["Online Presence", "Service Quality", "Price Point", "Customer Experience"];
    let priorities = ["HIGH", "HIGH", "MEDIUM", "MEDIUM", "LOW"];
    
    doc.heading(2, "MARKET POSITIONING MATRIX")
        .table(
            &["Factor", "Client", "Avg Competitor", "Opportunity"],
            factors
                .iter()
                .map(|f| vec![f.to_string(), "[1-10]".into(), "[1-10]".into(), "[High/Med/Low]".into()])
                .collect(),
        )
        .heading(2, "CLIENT SWOT ANALYSIS")
        .table(
            &["STRENGTHS", "WEAKNESSES"],
            rows(&[["• [Strength 1]\n• [Strength 2]\n• [Strength 3]", "• [Weakness 1]\n• [Weakness 2]\n• [Weakness 3]"]]),
        )
        .table(
            &["OPPORTUNITIES", "THREATS"],
            rows(&[["• [Opportunity 1]\n• [Opportunity 2]\n• [Opportunity 3]", "• [Threat 1]\n• [Threat 2]\n• [Threat 3]"]]),
        )
        .heading(2, "STRATEGIC RECOMMENDATIONS")
        .table(
            &["Priority", "Recommendation", "Expected Impact"],
            priorities
                .iter()
                .enumerate()
                .map(|(i, p)| vec![p.to_string(), format!("[Recommendation {}]", i + 1), "[Impact description]".into()])
                .collect(),
        )
        .heading(2, "RECOMMENDED NEXT STEPS")
        .numbered(&[
            "Schedule strategy session to discuss findings",
            "Prioritize quick-win opportunities",
            "Develop differentiation strategy",
            "Create implementation roadmap",
            "Begin execution of Phase 1 recommendations",
        ])
        .rule()
        .note(FOOTER)
        .note("CONFIDENTIAL - For intended recipient only")
}

fn rows<const N: usize>(data: &[[&str; N]]) -> Vec<Vec<String>> {
    data.iter().map(|row| owned(row)).collect()
}

/// Write both templates into `dir`, creating it if needed
pub async fn write_templates(dir: &Path) -> AppResult<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;
    
    let mut written = Vec::new();
    for (file, doc) in [
        (PROPOSAL_FILE, proposal_template()),
        (COMPETITIVE_ANALYSIS_FILE, competitive_analysis_template()),
    ] {
        let path = dir.join(file);
        tokio::fs::write(&path, doc.to_markdown()).await?;
        info!("Created: {}", path.display());
        written.push(path);
    }
    Ok(written)
}
