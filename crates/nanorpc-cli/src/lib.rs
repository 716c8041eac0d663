// Copyright 2025 nanorpc Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # nanorpc CLI
//!
//! Demo system and command-line runner for nanorpc.
//!
//! This crate provides four small services that call each other and a
//! binary that runs any combination of them:
//!
//! - **api**: Request/response types and HTTP endpoints of `svc1`..`svc4`
//! - **services**: The service implementations
//! - **node**: Turning command-line choices into a registry and a listener
//!
//! ## Architecture
//!
//! The CLI uses the `argh` crate for argument parsing. Local services run
//! in a `nanorpc-common` registry, remote ones are reached through
//! `nanorpc-client`, and `nanorpc-server` exposes the local ones.
//!
//! ## Key Commands
//!
//! - `nanorpc serve`: Run demo services and expose some of them over HTTP
//! - `nanorpc call`: Send one request to `svc2` and print the answer

pub mod api;
pub mod node;
pub mod services;
