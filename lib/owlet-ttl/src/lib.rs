//! owlet-ttl parses the [Turtle](https://www.w3.org/TR/turtle/) serialization
//! of RDF into [`Triple`](owlet_rdf::Triple)s.
//!
//! Usage example:
//! ```
//! use owlet_ttl::TurtleParser;
//!
//! let file = r#"@prefix ex: <http://example.com/> .
//! ex:s ex:p ex:o , "a literal" ."#;
//!
//! let triples = TurtleParser::new().parse_str(file)?;
//! assert_eq!(triples.len(), 2);
//! # Result::<_, owlet_ttl::TurtleSyntaxError>::Ok(())
//! ```

mod error;
mod parser;

pub use crate::error::{TextPosition, TurtleSyntaxError};
pub use crate::parser::TurtleParser;
