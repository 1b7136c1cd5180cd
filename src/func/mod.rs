mod activation;
mod cost;
mod learningrate;
mod completion;

pub use self::{
    activation::*,
    cost::*,
    completion::*,
    learningrate::*,
};

quick_error! {
    #[derive(Debug, PartialEq)]
    pub enum FuncError {
        UnknownActivationTag(tag: u8) {
            description("Unknown activation tag")
            display("Unknown activation tag {}", tag)
        }
        UnknownActivationName(name: String) {
            description("Unknown activation name")
            display("Unknown activation name '{}'", name)
        }
        UnknownCostTag(tag: u8) {
            description("Unknown cost tag")
            display("Unknown cost tag {}", tag)
        }
        UnknownCostName(name: String) {
            description("Unknown cost name")
            display("Unknown cost name '{}'", name)
        }
    }
}
