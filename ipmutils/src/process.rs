use sysinfo::System;

/// Processus trouvé par [`find_processes`].
#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub command_line: String,
}

/// Liste les processus dont le nom ou la ligne de commande complète vaut `command`.
///
/// Équivalent de `pgrep -fx <command>`.
pub fn find_processes(command: &str) -> Vec<ProcessInfo> {
    let mut system = System::new();
    system.refresh_processes();

    system
        .processes()
        .iter()
        .filter_map(|(pid, process)| {
            let command_line = process.cmd().join(" ");
            if command_line == command || process.name() == command {
                Some(ProcessInfo {
                    pid: pid.as_u32(),
                    name: process.name().to_string(),
                    command_line,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Envoie SIGKILL à tous les processus correspondant à `command`.
///
/// Retourne le nombre de processus effectivement tués.
pub fn kill_processes(command: &str) -> usize {
    let mut system = System::new();
    system.refresh_processes();

    system
        .processes()
        .values()
        .filter(|process| process.cmd().join(" ") == command || process.name() == command)
        .filter(|process| process.kill())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_has_no_process() {
        assert!(find_processes("ipmpv-surely-not-running-0f3a").is_empty());
    }
}
