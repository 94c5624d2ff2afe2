//! Workspace-level tests exercising the public scopetrace APIs end to end.

#[cfg(test)]
mod trace;
#[cfg(test)]
mod txlog;
