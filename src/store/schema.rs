pub(crate) const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS workflows (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS phases (
        id TEXT PRIMARY KEY,
        workflow_id TEXT NOT NULL,
        phase_order INTEGER NOT NULL,
        name TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        phase_id TEXT NOT NULL,
        status TEXT NOT NULL,
        description TEXT,
        assigned_agent_id TEXT,
        failure_reason TEXT,
        blocked_by TEXT,
        started_at INTEGER,
        completed_at INTEGER
    );

    CREATE TABLE IF NOT EXISTS agents (
        id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        current_task_id TEXT
    );

    CREATE TABLE IF NOT EXISTS agent_worktrees (
        id TEXT PRIMARY KEY,
        agent_id TEXT NOT NULL,
        worktree_path TEXT NOT NULL,
        branch_name TEXT NOT NULL,
        merge_status TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS workflow_results (
        id TEXT PRIMARY KEY,
        workflow_id TEXT NOT NULL,
        status TEXT NOT NULL,
        summary TEXT,
        created_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS task_queue (
        task_id TEXT PRIMARY KEY,
        enqueued_at INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_workflows_status ON workflows(status, created_at);
    CREATE INDEX IF NOT EXISTS idx_phases_workflow_order ON phases(workflow_id, phase_order);
    CREATE INDEX IF NOT EXISTS idx_tasks_phase_status ON tasks(phase_id, status);
    CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
    CREATE INDEX IF NOT EXISTS idx_agents_status ON agents(status);
    CREATE INDEX IF NOT EXISTS idx_worktrees_merge_status ON agent_worktrees(merge_status);
    CREATE INDEX IF NOT EXISTS idx_results_workflow_status ON workflow_results(workflow_id, status);
";
