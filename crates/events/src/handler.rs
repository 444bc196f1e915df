/// Execute an aggregate command in memory: decide, then apply each event.
///
/// No store, no bus. The workflow engine uses this inside a unit of work so
/// that later commands in the same transaction see earlier results.
pub fn execute<A>(
    aggregate: &mut A,
    command: &A::Command,
) -> Result<Vec<A::Event>, A::Error>
where
    A: flockerp_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
