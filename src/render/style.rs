//! Inline stylesheet and script shared by every page.

pub(super) const fn inline_css() -> &'static str {
    r"
        body { font-family: 'Microsoft YaHei', Arial, sans-serif; background-color: #f5f7fa; color: #333; line-height: 1.6; margin: 0; padding: 20px; }
        .container { max-width: 1000px; margin: 0 auto; background: #fff; border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); padding: 30px; }
        h1 { text-align: center; color: #2c3e50; margin-bottom: 30px; font-size: 28px; }
        .back-link { display: inline-block; margin: 0 10px 15px 0; padding: 6px 14px; background: #3498db; color: #fff; border-radius: 4px; text-decoration: none; }
        .back-link:hover { background: #2980b9; }
        .section-title { font-size: 20px; font-weight: bold; color: #2c3e50; border-left: 4px solid #3498db; padding-left: 10px; margin: 25px 0 15px; }
        .subsection-title { font-size: 16px; font-weight: bold; color: #34495e; margin: 15px 0 10px; }
        .info-list { border: 1px solid #e1e8ed; border-radius: 6px; }
        .info-row { display: flex; padding: 10px 15px; border-bottom: 1px solid #e1e8ed; }
        .info-row:last-child { border-bottom: none; }
        .info-label { width: 140px; font-weight: bold; color: #555; }
        .info-value { flex: 1; }
        .cm-info-grid { display: grid; grid-template-columns: 1fr 1fr; gap: 20px; }
        .link-group { margin-top: 15px; }
        .link-item, .requirement-link { color: #3498db; text-decoration: none; margin-right: 20px; }
        .link-item:hover, .requirement-link:hover { text-decoration: underline; }
        .requirement-item { padding: 6px 0; }
        .empty { color: #7f8c8d; font-style: italic; }
        .content { border: 1px solid #e1e8ed; border-radius: 6px; padding: 20px; }
        table { width: 100%; border-collapse: collapse; margin-top: 20px; }
        th { background: #3498db; color: #fff; padding: 12px; text-align: left; }
        td { padding: 10px 12px; border: 1px solid #e1e8ed; }
        td.owner-cell { background: #ecf0f1; font-weight: bold; vertical-align: middle; }
        td.empty { text-align: center; }
        .node { margin-left: 20px; }
        .node-content { display: flex; align-items: center; padding: 4px 0; }
        .level-badge { display: inline-block; width: 32px; text-align: center; color: #fff; border-radius: 3px; font-size: 12px; margin-right: 8px; }
        .level-sf { background: #e74c3c; }
        .level-ir { background: #3498db; }
        .level-sr { background: #2ecc71; }
        .level-ar { background: #f39c12; }
        .toggle { cursor: pointer; margin-left: 8px; color: #7f8c8d; user-select: none; }
        .children { display: none; }
        .children.show { display: block; }
        .btn { padding: 8px 16px; margin-right: 10px; border: none; border-radius: 4px; color: #fff; cursor: pointer; }
        .btn-expand { background: #2ecc71; }
        .btn-collapse { background: #e74c3c; }
    "
}

pub(super) const fn navigation_js() -> &'static str {
    r"
        document.addEventListener('DOMContentLoaded', function() {
            document.querySelectorAll('.toggle').forEach(function(toggle) {
                toggle.addEventListener('click', function() {
                    const children = this.parentElement.nextElementSibling;
                    if (children && children.classList.contains('children')) {
                        children.classList.toggle('show');
                        this.textContent = children.classList.contains('show') ? '▼' : '▶';
                    }
                });
            });
            document.getElementById('expandAll').addEventListener('click', function() {
                document.querySelectorAll('.children').forEach(function(c) { c.classList.add('show'); });
                document.querySelectorAll('.toggle').forEach(function(t) { t.textContent = '▼'; });
            });
            document.getElementById('collapseAll').addEventListener('click', function() {
                document.querySelectorAll('.children').forEach(function(c) { c.classList.remove('show'); });
                document.querySelectorAll('.toggle').forEach(function(t) { t.textContent = '▶'; });
            });
        });
    "
}
