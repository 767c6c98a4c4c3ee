use clap::ValueEnum;
use log::LevelFilter;
use tsp_core::{BranchingRule, CutAggressiveness, NodeSelection};

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum BranchingChoice {
    MostFractional,
    LengthWeighted,
    Strong,
}

impl BranchingChoice {
    pub fn to_rule(self, candidates: usize) -> BranchingRule {
        match self {
            BranchingChoice::MostFractional => BranchingRule::MostFractional,
            BranchingChoice::LengthWeighted => BranchingRule::LengthWeighted,
            BranchingChoice::Strong => BranchingRule::StrongBranching { candidates },
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SelectionChoice {
    DepthFirst,
    BestBound,
}

impl From<SelectionChoice> for NodeSelection {
    fn from(choice: SelectionChoice) -> Self {
        match choice {
            SelectionChoice::DepthFirst => NodeSelection::DepthFirst,
            SelectionChoice::BestBound => NodeSelection::BestBound,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum CutChoice {
    Default,
    Aggressive,
}

impl From<CutChoice> for CutAggressiveness {
    fn from(choice: CutChoice) -> Self {
        match choice {
            CutChoice::Default => CutAggressiveness::Default,
            CutChoice::Aggressive => CutAggressiveness::Aggressive,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LogFormat {
    Compact,
    Pretty,
}
