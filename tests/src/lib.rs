//! End-to-end checks of the discovery engine against scripted networks.

#[cfg(test)]
mod discovery;
#[cfg(test)]
mod net;
