/*!
Report emitters: the JSON export data contract and the console summary table.
Both are glue over the results bundle; neither is governed by the engine's
testable invariants, only by the wire format (export) and by manual
inspection (console).
*/

pub mod console;
pub mod export;
