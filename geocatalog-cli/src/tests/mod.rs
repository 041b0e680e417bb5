//! Unit tests for CLI configuration and command output.

use super::*;
